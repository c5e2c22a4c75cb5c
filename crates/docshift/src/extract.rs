//! Extractor
//!
//! Pulls every document matching a filter out of the document store and
//! materializes the result as a [`RecordSet`]. There is no paging: the full
//! result set is held in memory.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{Bson, Document},
    options::{ClientOptions, Credential},
    Client,
};
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{debug, info, instrument};

use crate::config::SourceConfig;
use crate::error::{Result, SyncError};
use crate::record::{RecordSet, Row};

/// Document predicate; the empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert to a query document, honoring extended JSON (`{"$oid": ..}`)
    pub fn to_document(&self) -> Result<Document> {
        match Bson::try_from(Value::Object(self.0.clone())) {
            Ok(Bson::Document(doc)) => Ok(doc),
            Ok(_) => Err(SyncError::config("Filter must be a JSON object")),
            Err(e) => Err(SyncError::config(format!("Invalid filter: {}", e))),
        }
    }
}

impl FromStr for Filter {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::all());
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(_) => Err(SyncError::config("Filter must be a JSON object")),
            Err(e) => Err(SyncError::config(format!("Filter is not valid JSON: {}", e))),
        }
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Read access to a schema-less document collection
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch every document in `collection` matching `filter`
    async fn fetch(&self, collection: &str, filter: &Filter) -> Result<Vec<Row>>;
}

/// Run the extraction stage
#[instrument(skip(source, filter), fields(filtered = !filter.is_all()))]
pub async fn extract(
    source: &dyn DocumentSource,
    collection: &str,
    filter: &Filter,
) -> Result<RecordSet> {
    let rows = source.fetch(collection, filter).await?;
    let records = RecordSet::from_rows(rows);

    info!(
        rows = records.len(),
        columns = records.columns().len(),
        "Extracted documents"
    );

    Ok(records)
}

/// [`DocumentSource`] backed by a MongoDB database
pub struct MongoSource {
    client: Client,
    database: String,
}

impl MongoSource {
    /// Create a client for the configured deployment
    ///
    /// The driver connects lazily, so connectivity errors surface on the
    /// first fetch.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(config.uri())
            .await
            .map_err(|e| SyncError::source(format!("Invalid document store URI: {}", e)))?;

        if let Some((username, password)) = config.credentials() {
            options.credential = Some(
                Credential::builder()
                    .username(username.to_string())
                    .password(password.to_string())
                    .build(),
            );
        }
        options.app_name = Some("docshift".to_string());

        let client = Client::with_options(options)
            .map_err(|e| SyncError::source(format!("Failed to create client: {}", e)))?;

        debug!(database = %config.database, "Document store client initialized");

        Ok(Self {
            client,
            database: config.database.clone(),
        })
    }
}

#[async_trait]
impl DocumentSource for MongoSource {
    async fn fetch(&self, collection: &str, filter: &Filter) -> Result<Vec<Row>> {
        let query = filter.to_document()?;

        let cursor = self
            .client
            .database(&self.database)
            .collection::<Document>(collection)
            .find(query)
            .await
            .map_err(|e| SyncError::source(format!("Query on {} failed: {}", collection, e)))?;

        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| SyncError::source(format!("Reading {} failed: {}", collection, e)))?;

        Ok(documents.into_iter().map(document_to_row).collect())
    }
}

/// Flatten a document into a row of scalars
pub fn document_to_row(document: Document) -> Row {
    document
        .into_iter()
        .map(|(key, value)| (key, bson_to_scalar(value)))
        .collect()
}

/// Map a BSON value onto a scalar a delimited file can carry
pub fn bson_to_scalar(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        // NaN and infinities have no JSON number form
        Bson::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) | Bson::Symbol(s) => Value::String(s),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(
            dt.try_to_rfc3339_string()
                .unwrap_or_else(|_| dt.timestamp_millis().to_string()),
        ),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        other => Value::String(other.into_relaxed_extjson().to_string()),
    }
}
