//! Docshift
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Moves a snapshot of a document collection into a warehouse table.
//!
//! A run has four stages, executed in order:
//!
//! 1. **Extract** every matching document into a [`record::RecordSet`]
//! 2. **Reconcile** its columns against the table's declared columns
//! 3. **Stage** the result as CSV in object storage
//! 4. **Load** it with a single bulk-copy statement
//!
//! Each stage talks to its external system through a trait
//! ([`extract::DocumentSource`], [`reconcile::Catalog`],
//! [`stage::ObjectStore`], [`load::BulkLoader`]), so the pipeline can be
//! driven against in-memory collaborators.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docshift::{
//!     config::AppConfig, driver, extract::{Filter, MongoSource}, notify::SparkPostNotifier,
//!     pipeline::{Pipeline, PipelineSettings}, storage::S3Store, warehouse::RedshiftWarehouse,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> docshift::Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let warehouse = Arc::new(RedshiftWarehouse::new(&config.warehouse));
//!     let pipeline = Pipeline::new(
//!         Arc::new(MongoSource::connect(&config.source).await?),
//!         warehouse.clone(),
//!         Arc::new(S3Store::new(&config.storage)),
//!         warehouse,
//!         PipelineSettings::from_config(&config, Filter::all()),
//!     );
//!
//!     let outcome = pipeline.run().await;
//!     let notifier = SparkPostNotifier::new(config.notify.clone())?;
//!     std::process::exit(driver::conclude(&outcome, &notifier).await as i32);
//! }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod load;
pub mod notify;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod stage;
pub mod storage;
pub mod warehouse;

// Re-export commonly used types
pub use error::{Result, SyncError};
pub use pipeline::{Pipeline, PipelineSettings, RunOutcome};
