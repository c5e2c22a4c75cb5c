//! Docshift - scheduled collection-to-warehouse load

use anyhow::Context;
use clap::Parser;
use docshift::{
    config::AppConfig,
    driver,
    extract::{Filter, MongoSource},
    notify::SparkPostNotifier,
    pipeline::{Pipeline, PipelineSettings},
    storage::S3Store,
    warehouse::RedshiftWarehouse,
};
use docshift_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "docshift")]
#[command(author, version, about = "Load a document collection snapshot into a warehouse table")]
struct Cli {
    /// Document filter as a JSON object (default: every document)
    #[arg(short, long, env = "DOCSHIFT_FILTER", default_value = "{}")]
    filter: String,

    /// Read environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .output(LogOutput::Both)
        .log_file_prefix("docshift")
        .filter_directives("sqlx=warn,aws_smithy_runtime=info,mongodb=info")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    let log_handle = match init_logging(&log_config) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        },
    };

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = ?e, "Run could not be started");
            1
        },
    };

    // Drain buffered file output before exiting
    log_handle.flush();
    ExitCode::from(code)
}

/// Build the collaborators, run the pipeline, and report its outcome
async fn run(cli: &Cli) -> anyhow::Result<u8> {
    let config = AppConfig::load(cli.env_file.as_deref()).context("Failed to load configuration")?;
    let filter: Filter = cli.filter.parse().context("Invalid --filter")?;

    info!(
        collection = %config.source.collection,
        table = %config.warehouse.qualified_table(),
        "Starting docshift run"
    );

    let notifier = SparkPostNotifier::new(config.notify.clone())?;
    let source = MongoSource::connect(&config.source).await?;
    let warehouse = Arc::new(RedshiftWarehouse::new(&config.warehouse));
    let store = S3Store::new(&config.storage);

    let pipeline = Pipeline::new(
        Arc::new(source),
        warehouse.clone(),
        Arc::new(store),
        warehouse,
        PipelineSettings::from_config(&config, filter),
    );

    let outcome = pipeline.run().await;
    Ok(driver::conclude(&outcome, &notifier).await)
}
