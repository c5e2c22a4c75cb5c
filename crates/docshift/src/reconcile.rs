//! Schema reconciliation
//!
//! Narrows an extracted record set to the columns the destination table
//! declares. Extra document fields are dropped; declared columns that no
//! document carries are left to the loader's null handling.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::record::RecordSet;

/// Warehouse metadata access
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Declared column names of `schema.table`
    async fn declared_columns(&self, schema: &str, table: &str) -> Result<Vec<String>>;
}

/// Extracted columns absent from the declared set, in extraction order
pub fn columns_to_drop(extracted: &[String], declared: &[String]) -> Vec<String> {
    let declared: HashSet<&str> = declared.iter().map(String::as_str).collect();
    extracted
        .iter()
        .filter(|column| !declared.contains(column.as_str()))
        .cloned()
        .collect()
}

/// Drop every undeclared column from `records`; returns the dropped names
pub fn reconcile(records: &mut RecordSet, declared: &[String]) -> Vec<String> {
    let dropped = columns_to_drop(records.columns(), declared);
    records.drop_columns(&dropped);
    dropped
}

/// Run the reconciliation stage against the live catalog
#[instrument(skip(catalog, records), fields(rows = records.len()))]
pub async fn reconcile_with_catalog(
    catalog: &dyn Catalog,
    records: &mut RecordSet,
    schema: &str,
    table: &str,
) -> Result<Vec<String>> {
    let declared = catalog.declared_columns(schema, table).await?;
    let dropped = reconcile(records, &declared);

    if !dropped.is_empty() {
        warn!(
            dropped = ?dropped,
            "Dropping columns not declared on {}.{}", schema, table
        );
    }

    if records.columns().is_empty() {
        return Err(SyncError::NoLoadableColumns {
            table: format!("{}.{}", schema, table),
        });
    }

    info!(
        declared = declared.len(),
        kept = records.columns().len(),
        "Reconciled columns"
    );

    Ok(dropped)
}
