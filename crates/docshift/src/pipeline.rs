//! Pipeline driver
//!
//! Runs extract → reconcile → stage → load in order, strictly one after the
//! other. The first stage error ends the run; the result is returned as a
//! [`RunOutcome`] value for the caller to act on.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::SyncError;
use crate::extract::{extract, DocumentSource, Filter};
use crate::load::{load, BulkLoader, CopyStatement, LoadCredentials, LoadSummary};
use crate::notify::FailureNotice;
use crate::reconcile::{reconcile_with_catalog, Catalog};
use crate::stage::{stage, ObjectStore};

/// Pipeline step, as reported on failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Reconcile,
    Stage,
    Load,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Extract => write!(f, "extract"),
            Stage::Reconcile => write!(f, "reconcile"),
            Stage::Stage => write!(f, "stage"),
            Stage::Load => write!(f, "load"),
        }
    }
}

/// A failed run: the error and where it happened
#[derive(Debug)]
pub struct Failure {
    pub stage: Stage,
    pub collection: String,
    pub error: SyncError,
}

impl Failure {
    pub fn notice(&self) -> FailureNotice {
        FailureNotice {
            collection: self.collection.clone(),
            stage: self.stage.to_string(),
            error: self.error.to_string(),
        }
    }
}

/// Result of one pipeline run
#[derive(Debug)]
pub enum RunOutcome {
    /// Data was loaded and committed
    Loaded(LoadSummary),
    /// The filter matched no documents; nothing else ran
    Empty,
    Failed(Failure),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, RunOutcome::Failed(_))
    }
}

/// Per-run parameters
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub collection: String,
    pub filter: Filter,
    pub schema: String,
    pub table: String,
    pub staging_path: PathBuf,
    pub staging_key: String,
    pub credentials: LoadCredentials,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig, filter: Filter) -> Self {
        let credentials = match &config.warehouse.iam_role {
            Some(arn) => LoadCredentials::IamRole(arn.clone()),
            None => LoadCredentials::AccessKeys {
                access_key_id: config.storage.access_key.clone(),
                secret_access_key: config.storage.secret_key.clone(),
            },
        };

        Self {
            collection: config.source.collection.clone(),
            filter,
            schema: config.warehouse.schema.clone(),
            table: config.warehouse.table.clone(),
            staging_path: config.staging.local_path.clone(),
            staging_key: config.staging.key.clone(),
            credentials,
        }
    }
}

/// The four collaborators plus run settings
pub struct Pipeline {
    source: Arc<dyn DocumentSource>,
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ObjectStore>,
    loader: Arc<dyn BulkLoader>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ObjectStore>,
        loader: Arc<dyn BulkLoader>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            catalog,
            store,
            loader,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Execute one full run
    pub async fn run(&self) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, collection = %self.settings.collection);

        match self.execute().instrument(span).await {
            Ok(Some(summary)) => RunOutcome::Loaded(summary),
            Ok(None) => RunOutcome::Empty,
            Err((stage, error)) => RunOutcome::Failed(Failure {
                stage,
                collection: self.settings.collection.clone(),
                error,
            }),
        }
    }

    async fn execute(&self) -> std::result::Result<Option<LoadSummary>, (Stage, SyncError)> {
        let settings = &self.settings;

        let mut records = extract(self.source.as_ref(), &settings.collection, &settings.filter)
            .await
            .map_err(at(Stage::Extract))?;

        if records.is_empty() {
            info!("No documents matched; skipping reconcile, stage and load");
            return Ok(None);
        }

        reconcile_with_catalog(
            self.catalog.as_ref(),
            &mut records,
            &settings.schema,
            &settings.table,
        )
        .await
        .map_err(at(Stage::Reconcile))?;

        let (file, object) = stage(
            &records,
            self.store.as_ref(),
            &settings.staging_path,
            &settings.staging_key,
        )
        .await
        .map_err(at(Stage::Stage))?;
        drop(records);

        let statement = CopyStatement::new(
            settings.schema.clone(),
            settings.table.clone(),
            file.columns.clone(),
            &object,
            settings.credentials.clone(),
        );

        let summary = load(self.loader.as_ref(), &statement, &file)
            .await
            .map_err(at(Stage::Load))?;

        Ok(Some(summary))
    }
}

fn at(stage: Stage) -> impl FnOnce(SyncError) -> (Stage, SyncError) {
    move |error| (stage, error)
}
