//! Pipeline error types
//!
//! Every stage returns [`SyncError`]. Nothing is retried or recovered inside a
//! stage; the pipeline driver is the single place errors are caught.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error type for a docshift run
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document store connection or query failed
    #[error("Document store error: {0}")]
    Source(String),

    /// Warehouse catalog lookup failed
    #[error("Catalog query failed: {0}")]
    Catalog(String),

    /// No extracted column survived reconciliation
    #[error("No extracted column is declared on {table}; nothing to load")]
    NoLoadableColumns { table: String },

    /// Local staging file could not be written or removed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Object store upload failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Bulk-load statement failed
    #[error("Bulk load failed: {0}")]
    Load(String),

    /// Failure notification could not be delivered
    #[error("Notification failed: {0}")]
    Notify(String),
}

impl SyncError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }
}

impl From<docshift_common::CommonError> for SyncError {
    fn from(err: docshift_common::CommonError) -> Self {
        match err {
            docshift_common::CommonError::Io(e) => SyncError::Io(e),
            other => SyncError::Config(other.to_string()),
        }
    }
}
