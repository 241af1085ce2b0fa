//! Object storage interface for snapshot data (MinIO/S3 compatible).

use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use aq_common::{AqError, AqResult, Pollutant};

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "aire-data-lake".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
        }
    }
}

impl ObjectStorageConfig {
    /// Assemble from `S3_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("S3_ENDPOINT").unwrap_or(defaults.endpoint),
            bucket: std::env::var("S3_BUCKET").unwrap_or(defaults.bucket),
            access_key_id: std::env::var("S3_ACCESS_KEY").unwrap_or(defaults.access_key_id),
            secret_access_key: std::env::var("S3_SECRET_KEY").unwrap_or(defaults.secret_access_key),
            region: std::env::var("S3_REGION").unwrap_or(defaults.region),
            allow_http: true,
        }
    }
}

/// Object storage client for snapshot and artifact blobs.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> AqResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| AqError::StorageError(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    /// Write bytes to a path in the bucket (last writer wins).
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> AqResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| AqError::StorageError(format!("Failed to write {}: {}", path, e)))?;

        Ok(())
    }

    /// Read bytes from a path. A missing object surfaces as
    /// [`AqError::SnapshotNotFound`] so callers can distinguish skip from fail.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn get(&self, path: &str) -> AqResult<Bytes> {
        let location = Path::from(path);

        let result = self.store.get(&location).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => AqError::SnapshotNotFound(path.to_string()),
            other => AqError::StorageError(format!("Failed to read {}: {}", path, other)),
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| AqError::StorageError(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Serialize a value as JSON and write it.
    pub async fn put_json<T: Serialize>(&self, path: &str, value: &T) -> AqResult<()> {
        let body = serde_json::to_vec(value)?;
        self.put(path, Bytes::from(body)).await
    }

    /// Read and deserialize a JSON object, or `None` when the key is absent.
    ///
    /// Malformed JSON is a real error, not an absence.
    pub async fn get_json_opt<T: DeserializeOwned>(&self, path: &str) -> AqResult<Option<T>> {
        match self.get(path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| {
                    AqError::StorageError(format!("Malformed JSON at {}: {}", path, e))
                })?;
                Ok(Some(value))
            }
            Err(AqError::SnapshotNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check if an object exists.
    pub async fn exists(&self, path: &str) -> AqResult<bool> {
        let location = Path::from(path);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(AqError::StorageError(format!(
                "Failed to check {}: {}",
                path, e
            ))),
        }
    }

    /// List objects with a given prefix.
    pub async fn list(&self, prefix: &str) -> AqResult<Vec<String>> {
        use futures::TryStreamExt;

        let prefix_path = Path::from(prefix);
        let mut paths = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| AqError::StorageError(format!("List failed: {}", e)))?
        {
            paths.push(meta.location.to_string());
        }

        Ok(paths)
    }

    /// Delete an object.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn delete(&self, path: &str) -> AqResult<()> {
        let location = Path::from(path);

        self.store
            .delete(&location)
            .await
            .map_err(|e| AqError::StorageError(format!("Failed to delete {}: {}", path, e)))?;

        Ok(())
    }
}

/// Path builder for the fixed storage layout.
pub struct StoragePath;

impl StoragePath {
    /// One forecast snapshot per target hour.
    /// Format: forecast/{YYYY-MM-DD_HH-MM}.json
    pub fn forecast_hour(stamp: &str) -> String {
        format!("forecast/{}.json", stamp)
    }

    /// The live-grid singleton, overwritten at ingestion cadence.
    pub fn live_latest() -> String {
        "live_grid/latest_grid.json".to_string()
    }

    /// Realized history grids written by the live ingestion layer.
    /// Format: live_grid/grid_{YYYY-MM-DD_HH-MM}.json
    pub fn live_history(stamp: &str) -> String {
        format!("live_grid/grid_{}.json", stamp)
    }

    /// The 24 h city-wide timeline summary.
    pub fn timeline() -> String {
        "forecast_24h.json".to_string()
    }

    /// The calibration-coefficients singleton.
    pub fn coefficients() -> String {
        "config/calibration_coefficients.json".to_string()
    }

    /// Pre-trained model artifact for one pollutant.
    /// Format: models/model_{pollutant}.json
    pub fn model_artifact(pollutant: Pollutant) -> String {
        format!("models/model_{}.json", pollutant.key())
    }
}
