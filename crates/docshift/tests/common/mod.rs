//! Shared test doubles for pipeline integration tests
//!
//! Every fake appends to a shared call log so tests can assert which
//! collaborators ran and in what order.

#![allow(dead_code)]

use async_trait::async_trait;
use docshift::{
    extract::{DocumentSource, Filter},
    load::{BulkLoader, CopyStatement, LoadCredentials},
    notify::{FailureNotice, Notifier},
    pipeline::{Pipeline, PipelineSettings},
    reconcile::Catalog,
    record::Row,
    stage::{ObjectStore, StagedObject},
    Result, SyncError,
};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;

pub type CallLog = Arc<Mutex<Vec<String>>>;

fn record(log: &CallLog, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

/// Turn `json!` objects into rows
pub fn rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Object(map) => map,
            other => panic!("row must be an object, got {}", other),
        })
        .collect()
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// In-memory sink for JSON log lines emitted while it is installed
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Install as the thread's default subscriber until the guard drops
    pub fn install(&self) -> DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<Value> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    pub fn count_at(&self, level: &str) -> usize {
        self.lines()
            .iter()
            .filter(|line| line["level"] == level)
            .count()
    }
}

pub struct FakeSource {
    pub log: CallLog,
    pub rows: Vec<Row>,
    pub fail: bool,
}

#[async_trait]
impl DocumentSource for FakeSource {
    async fn fetch(&self, collection: &str, _filter: &Filter) -> Result<Vec<Row>> {
        record(&self.log, format!("fetch:{}", collection));
        if self.fail {
            return Err(SyncError::source("connection refused"));
        }
        Ok(self.rows.clone())
    }
}

pub struct FakeCatalog {
    pub log: CallLog,
    pub declared: Vec<String>,
    pub fail: bool,
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn declared_columns(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        record(&self.log, format!("catalog:{}.{}", schema, table));
        if self.fail {
            return Err(SyncError::catalog("relation \"information_schema.columns\" is unavailable"));
        }
        Ok(self.declared.clone())
    }
}

pub struct FakeStore {
    pub log: CallLog,
    pub fail: bool,
    /// Key and file content of each upload
    pub uploads: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn upload_file(&self, path: &Path, key: &str) -> Result<StagedObject> {
        record(&self.log, format!("upload:{}", key));
        if self.fail {
            return Err(SyncError::upload("access denied"));
        }
        let content = std::fs::read_to_string(path)?;
        self.uploads.lock().unwrap().push((key.to_string(), content));
        Ok(StagedObject {
            bucket: "test-bucket".to_string(),
            key: key.to_string(),
        })
    }
}

pub struct FakeLoader {
    pub log: CallLog,
    pub fail: bool,
    pub statements: Mutex<Vec<CopyStatement>>,
}

#[async_trait]
impl BulkLoader for FakeLoader {
    async fn copy(&self, statement: &CopyStatement) -> Result<()> {
        record(&self.log, format!("copy:{}", statement.table));
        self.statements.lock().unwrap().push(statement.clone());
        if self.fail {
            return Err(SyncError::load("invalid input syntax for type integer"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub notices: Mutex<Vec<FailureNotice>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &FailureNotice) -> Result<()> {
        self.notices.lock().unwrap().push(notice.clone());
        if self.fail {
            return Err(SyncError::notify("SparkPost returned 401 Unauthorized"));
        }
        Ok(())
    }
}

/// Knobs for a harness run
#[derive(Default)]
pub struct Scenario {
    pub rows: Vec<Row>,
    pub declared: Vec<String>,
    pub fail_source: bool,
    pub fail_catalog: bool,
    pub fail_upload: bool,
    pub fail_load: bool,
}

/// A pipeline wired to fakes, staging into a temporary directory
pub struct Harness {
    pub log: CallLog,
    pub store: Arc<FakeStore>,
    pub loader: Arc<FakeLoader>,
    pub staging_path: PathBuf,
    pub pipeline: Pipeline,
    _dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(scenario: Scenario) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let staging_path = dir.path().join("data.csv");
        let log: CallLog = Arc::default();

        let source = Arc::new(FakeSource {
            log: log.clone(),
            rows: scenario.rows,
            fail: scenario.fail_source,
        });
        let catalog = Arc::new(FakeCatalog {
            log: log.clone(),
            declared: scenario.declared,
            fail: scenario.fail_catalog,
        });
        let store = Arc::new(FakeStore {
            log: log.clone(),
            fail: scenario.fail_upload,
            uploads: Mutex::new(Vec::new()),
        });
        let loader = Arc::new(FakeLoader {
            log: log.clone(),
            fail: scenario.fail_load,
            statements: Mutex::new(Vec::new()),
        });

        let settings = PipelineSettings {
            collection: "events".to_string(),
            filter: Filter::all(),
            schema: "public".to_string(),
            table: "events".to_string(),
            staging_path: staging_path.clone(),
            staging_key: "data.csv".to_string(),
            credentials: LoadCredentials::AccessKeys {
                access_key_id: "AKIATEST".to_string(),
                secret_access_key: "secret".to_string(),
            },
        };

        let pipeline = Pipeline::new(source, catalog, store.clone(), loader.clone(), settings);

        Self {
            log,
            store,
            loader,
            staging_path,
            pipeline,
            _dir: dir,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn called(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}
