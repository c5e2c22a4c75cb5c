//! Loader
//!
//! Builds the bulk-copy statement that ingests the staged object, hands it to
//! the warehouse, and removes the local artifact once the load is committed.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

use crate::error::{Result, SyncError};
use crate::stage::{StagedFile, StagedObject};

/// Format options applied to every load
pub const COPY_OPTIONS: &str =
    "DELIMITER ',' FILLRECORD EMPTYASNULL IGNOREHEADER 1 REMOVEQUOTES ESCAPE";

const REDACTED: &str = "********";

/// How the warehouse authenticates against the object store
#[derive(Clone, PartialEq, Eq)]
pub enum LoadCredentials {
    AccessKeys {
        access_key_id: String,
        secret_access_key: String,
    },
    IamRole(String),
}

impl LoadCredentials {
    fn clause(&self, redact: bool) -> String {
        match self {
            LoadCredentials::AccessKeys {
                access_key_id,
                secret_access_key,
            } => {
                let secret = if redact { REDACTED } else { secret_access_key.as_str() };
                format!(
                    "CREDENTIALS {}",
                    quote_literal(&format!(
                        "aws_access_key_id={};aws_secret_access_key={}",
                        access_key_id, secret
                    ))
                )
            },
            LoadCredentials::IamRole(arn) => format!("IAM_ROLE {}", quote_literal(arn)),
        }
    }
}

impl std::fmt::Debug for LoadCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadCredentials::AccessKeys { access_key_id, .. } => f
                .debug_struct("AccessKeys")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &REDACTED)
                .finish(),
            LoadCredentials::IamRole(arn) => f.debug_tuple("IamRole").field(arn).finish(),
        }
    }
}

/// A single bulk-copy statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyStatement {
    pub schema: String,
    pub table: String,
    /// Must match the staged file's header order
    pub columns: Vec<String>,
    pub source_uri: String,
    pub credentials: LoadCredentials,
}

impl CopyStatement {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        source: &StagedObject,
        credentials: LoadCredentials,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            columns,
            source_uri: source.uri(),
            credentials,
        }
    }

    /// Statement text to execute
    pub fn sql(&self) -> String {
        self.render(false)
    }

    /// Statement text with secrets masked, for logs
    pub fn redacted(&self) -> String {
        self.render(true)
    }

    fn render(&self, redact: bool) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "COPY {}.{} ({}) FROM {} {} {}",
            quote_ident(&self.schema),
            quote_ident(&self.table),
            columns,
            quote_literal(&self.source_uri),
            self.credentials.clause(redact),
            COPY_OPTIONS
        )
    }
}

/// Warehouse bulk ingestion
#[async_trait]
pub trait BulkLoader: Send + Sync {
    /// Execute `statement` and commit
    async fn copy(&self, statement: &CopyStatement) -> Result<()>;
}

/// Outcome of a committed load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub source_uri: String,
    /// Local artifact that was removed after the commit
    pub removed: PathBuf,
}

/// Run the load stage
///
/// The local staged file is removed only after the copy commits; on failure
/// it is left in place and overwritten by the next run.
#[instrument(skip_all, fields(table = %statement.table, rows = staged.rows))]
pub async fn load(
    loader: &dyn BulkLoader,
    statement: &CopyStatement,
    staged: &StagedFile,
) -> Result<LoadSummary> {
    debug!(sql = %statement.redacted(), "Issuing bulk copy");

    loader.copy(statement).await?;
    tokio::fs::remove_file(&staged.path).await.map_err(|e| {
        SyncError::Io(std::io::Error::new(
            e.kind(),
            format!(
                "load into {}.{} committed; only removing {} failed: {}",
                statement.schema,
                statement.table,
                staged.path.display(),
                e
            ),
        ))
    })?;

    info!(
        source = %statement.source_uri,
        "Load committed for {}.{}", statement.schema, statement.table
    );

    Ok(LoadSummary {
        table: format!("{}.{}", statement.schema, statement.table),
        rows: staged.rows,
        columns: statement.columns.clone(),
        source_uri: statement.source_uri.clone(),
        removed: staged.path.clone(),
    })
}

/// Double-quote an identifier
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Single-quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
