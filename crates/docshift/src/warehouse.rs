//! Warehouse access over the Postgres wire protocol
//!
//! Each operation acquires its own connection and releases it when done: one
//! for the catalog lookup, one for the bulk load.

use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgConnection},
    Connection, Executor,
};
use tracing::{debug, instrument};

use crate::config::WarehouseConfig;
use crate::error::{Result, SyncError};
use crate::load::{BulkLoader, CopyStatement};
use crate::reconcile::Catalog;

/// Declared columns of a table in declaration order
///
/// `information_schema.columns` covers every schema the login can see.
/// `pg_table_def` only lists schemas on the session `search_path`.
pub const CATALOG_QUERY: &str = r#"
    SELECT column_name::varchar
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2
    ORDER BY ordinal_position
"#;

/// Redshift cluster reachable with a user/password login
pub struct RedshiftWarehouse {
    options: PgConnectOptions,
}

impl RedshiftWarehouse {
    pub fn new(config: &WarehouseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database)
            .application_name("docshift");

        Self { options }
    }

    async fn connect(&self) -> std::result::Result<PgConnection, sqlx::Error> {
        PgConnection::connect_with(&self.options).await
    }
}

#[async_trait]
impl Catalog for RedshiftWarehouse {
    #[instrument(skip(self))]
    async fn declared_columns(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let mut conn = self
            .connect()
            .await
            .map_err(|e| SyncError::catalog(format!("Failed to connect: {}", e)))?;

        let columns: Vec<String> = sqlx::query_scalar(CATALOG_QUERY)
            .bind(schema)
            .bind(table)
            .fetch_all(&mut conn)
            .await
            .map_err(|e| SyncError::catalog(e.to_string()))?;

        conn.close()
            .await
            .map_err(|e| SyncError::catalog(format!("Failed to close connection: {}", e)))?;

        debug!(count = columns.len(), "Fetched declared columns");

        Ok(columns)
    }
}

#[async_trait]
impl BulkLoader for RedshiftWarehouse {
    async fn copy(&self, statement: &CopyStatement) -> Result<()> {
        let mut conn = self
            .connect()
            .await
            .map_err(|e| SyncError::load(format!("Failed to connect: {}", e)))?;

        let sql = statement.sql();

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| SyncError::load(e.to_string()))?;
        tx.execute(sqlx::raw_sql(&sql))
            .await
            .map_err(|e| SyncError::load(e.to_string()))?;
        tx.commit().await.map_err(|e| SyncError::load(e.to_string()))?;

        conn.close()
            .await
            .map_err(|e| SyncError::load(format!("Failed to close connection: {}", e)))?;

        Ok(())
    }
}
