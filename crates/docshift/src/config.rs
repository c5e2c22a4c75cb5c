//! Configuration management
//!
//! All settings come from environment variables (optionally seeded from a
//! `.env` file) and are gathered once into an [`AppConfig`] that is passed
//! explicitly to every stage.

use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default document store port.
pub const DEFAULT_MONGODB_PORT: u16 = 27017;

/// Default warehouse port (Redshift).
pub const DEFAULT_WAREHOUSE_PORT: u16 = 5439;

/// Default destination schema.
pub const DEFAULT_WAREHOUSE_SCHEMA: &str = "public";

/// Default object store region.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Default local staging file, also used as the object key.
pub const DEFAULT_STAGING_FILE: &str = "data.csv";

/// Default SparkPost API base URL.
pub const DEFAULT_SPARKPOST_API_URL: &str = "https://api.sparkpost.com";

/// Default subject line of failure notifications.
pub const DEFAULT_NOTIFY_SUBJECT: &str = "docshift run failed";

const MASK: &str = "********";

/// Complete run configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub warehouse: WarehouseConfig,
    pub storage: StorageConfig,
    pub staging: StagingConfig,
    pub notify: NotifyConfig,
}

/// Document store settings
#[derive(Clone)]
pub struct SourceConfig {
    /// Full connection string; overrides host and port when set
    pub uri: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub collection: String,
}

/// Warehouse settings
#[derive(Clone)]
pub struct WarehouseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub schema: String,
    pub table: String,
    /// Role the warehouse assumes to read the staged object
    pub iam_role: Option<String>,
}

/// Object store settings
#[derive(Clone)]
pub struct StorageConfig {
    /// Custom endpoint (MinIO or other S3-compatible stores)
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
}

/// Local and remote location of the staged artifact
#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub local_path: PathBuf,
    pub key: String,
}

/// Failure notification settings
#[derive(Clone)]
pub struct NotifyConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub sandbox: bool,
}

impl SourceConfig {
    /// Connection string without credentials
    pub fn uri(&self) -> String {
        match &self.uri {
            Some(uri) => uri.clone(),
            None => format!("mongodb://{}:{}", self.host, self.port),
        }
    }

    /// Username and password, only when both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) => Some((user, password)),
            _ => None,
        }
    }
}

impl WarehouseConfig {
    /// `schema.table` as written in log lines and errors
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl StorageConfig {
    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: DEFAULT_S3_REGION.to_string(),
            bucket: bucket.into(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            path_style: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    ///
    /// Variables from `env_file` (or `./.env` when none is given) are applied
    /// first without overriding variables that are already set.
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| {
                    SyncError::config(format!("Failed to read {}: {}", path.display(), e))
                })?;
            },
            None => {
                dotenvy::dotenv().ok();
            },
        }

        let config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let staging_file = env
            .optional("STAGING_FILE")
            .unwrap_or_else(|| DEFAULT_STAGING_FILE.to_string());
        let staging_key = env.optional("STAGING_KEY").unwrap_or_else(|| {
            Path::new(&staging_file)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| staging_file.clone())
        });

        Ok(Self {
            source: SourceConfig {
                uri: env.optional("MONGODB_URI"),
                host: env.optional("MONGODB_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: env.parse_or("MONGODB_PORT", DEFAULT_MONGODB_PORT)?,
                username: env.optional("MONGODB_USER"),
                password: env.optional("MONGODB_PASSWORD"),
                database: env.required("MONGODB_DATABASE")?,
                collection: env.required("MONGODB_COLLECTION")?,
            },
            warehouse: WarehouseConfig {
                host: env.required("REDSHIFT_HOST")?,
                port: env.parse_or("REDSHIFT_PORT", DEFAULT_WAREHOUSE_PORT)?,
                database: env.required("REDSHIFT_DB")?,
                username: env.required("REDSHIFT_USER")?,
                password: env.required("REDSHIFT_PASSWORD")?,
                schema: env
                    .optional("REDSHIFT_SCHEMA")
                    .unwrap_or_else(|| DEFAULT_WAREHOUSE_SCHEMA.to_string()),
                table: env.required("REDSHIFT_TABLE")?,
                iam_role: env.optional("REDSHIFT_IAM_ROLE"),
            },
            storage: StorageConfig {
                endpoint: env.optional("S3_ENDPOINT"),
                region: env
                    .optional("AWS_REGION")
                    .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
                bucket: env.required("S3_BUCKET_NAME")?,
                access_key: env.required("AWS_ACCESS_KEY_ID")?,
                secret_key: env.required("AWS_SECRET_ACCESS_KEY")?,
                path_style: env.parse_or("S3_PATH_STYLE", false)?,
            },
            staging: StagingConfig {
                local_path: PathBuf::from(staging_file),
                key: staging_key,
            },
            notify: NotifyConfig {
                api_url: env
                    .optional("SPARKPOST_API_URL")
                    .unwrap_or_else(|| DEFAULT_SPARKPOST_API_URL.to_string()),
                api_key: env.required("SPARKPOST_API_KEY")?,
                from: env.required("NOTIFY_FROM")?,
                recipients: env
                    .required("NOTIFY_RECIPIENTS")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                subject: env
                    .optional("NOTIFY_SUBJECT")
                    .unwrap_or_else(|| DEFAULT_NOTIFY_SUBJECT.to_string()),
                sandbox: env.parse_or("NOTIFY_SANDBOX", false)?,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.source.port == 0 {
            return Err(SyncError::config("MONGODB_PORT must be greater than 0"));
        }

        if self.source.username.is_some() != self.source.password.is_some() {
            tracing::warn!(
                "Only one of MONGODB_USER / MONGODB_PASSWORD is set; connecting without credentials"
            );
        }

        if self.warehouse.port == 0 {
            return Err(SyncError::config("REDSHIFT_PORT must be greater than 0"));
        }

        if self.warehouse.schema.is_empty() {
            return Err(SyncError::config("REDSHIFT_SCHEMA cannot be empty"));
        }

        if self.staging.key.is_empty() {
            return Err(SyncError::config("STAGING_KEY cannot be empty"));
        }

        if self.notify.recipients.is_empty() {
            return Err(SyncError::config(
                "NOTIFY_RECIPIENTS must name at least one address",
            ));
        }

        Ok(())
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> Result<String> {
        self.optional(name)
            .ok_or_else(|| SyncError::config(format!("{} must be set", name)))
    }

    fn parse_or<T: std::str::FromStr>(&self, name: &str, default: T) -> Result<T> {
        match self.optional(name) {
            Some(raw) => raw
                .parse()
                .map_err(|_| SyncError::config(format!("{} has an invalid value: {}", name, raw))),
            None => Ok(default),
        }
    }
}

fn mask(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| MASK)
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("uri", &mask(&self.uri))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("database", &self.database)
            .field("collection", &self.collection)
            .finish()
    }
}

impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &MASK)
            .field("schema", &self.schema)
            .field("table", &self.table)
            .field("iam_role", &self.iam_role)
            .finish()
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &MASK)
            .field("path_style", &self.path_style)
            .finish()
    }
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &MASK)
            .field("from", &self.from)
            .field("recipients", &self.recipients)
            .field("subject", &self.subject)
            .field("sandbox", &self.sandbox)
            .finish()
    }
}
