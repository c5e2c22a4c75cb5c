use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::config::StorageConfig;
use crate::error::{Result, SyncError};
use crate::stage::{ObjectStore, StagedObject};

/// S3 (or S3-compatible) bucket holding the staged artifact
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> Self {
        debug!("Initializing object store with config: {:?}", config);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "docshift-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!("Object store client initialized for bucket: {}", config.bucket);

        Self {
            client,
            bucket: config.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self))]
    async fn upload_file(&self, path: &Path, key: &str) -> Result<StagedObject> {
        let size = tokio::fs::metadata(path).await?.len();

        debug!("Uploading {} bytes to s3://{}/{}", size, self.bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| SyncError::upload(format!("Failed to open {}: {}", path.display(), e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("text/csv")
            .content_length(size as i64)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                SyncError::upload(format!(
                    "Failed to upload to s3://{}/{}: {}",
                    self.bucket,
                    key,
                    aws_sdk_s3::error::DisplayErrorContext(&e)
                ))
            })?;

        Ok(StagedObject {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_configured_bucket() {
        let store = S3Store::new(&StorageConfig::for_minio("http://localhost:9000", "staging"));
        assert_eq!(store.bucket(), "staging");
    }

    #[tokio::test]
    async fn test_upload_missing_file_fails_before_network() {
        let store = S3Store::new(&StorageConfig::for_minio("http://127.0.0.1:9", "staging"));
        let result = store
            .upload_file(Path::new("/nonexistent/docshift/data.csv"), "data.csv")
            .await;

        assert!(matches!(result, Err(SyncError::Io(_))));
    }
}
