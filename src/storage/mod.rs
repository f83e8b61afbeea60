pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreError;

pub use s3::S3Client;

/// Durable blob storage used for temperature snapshots.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create `bucket` unless it already exists.
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    async fn put_object(&self, bucket: &str, name: &str, body: Vec<u8>) -> Result<(), StoreError>;
}

/// One persisted aggregate, as written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp: String,
    pub temperature: i64,
}

impl SnapshotRecord {
    pub fn new(at: DateTime<Utc>, temperature: i64) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
            temperature,
        }
    }

    /// `temperature_<timestamp>.json`; the timestamp keeps names unique.
    pub fn object_name(&self) -> String {
        format!("temperature_{}.json", self.timestamp)
    }
}

/// Writes snapshot records into a single bucket.
#[derive(Clone)]
pub struct SnapshotWriter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl SnapshotWriter {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self { store, bucket: bucket.into() }
    }

    /// Make sure the target bucket exists. Called once at startup.
    pub async fn ensure_bucket(&self) -> Result<(), StoreError> {
        self.store.ensure_bucket(&self.bucket).await
    }

    /// Persist `temperature` stamped with the current time and return the
    /// object name it was written under.
    pub async fn write(&self, temperature: i64) -> Result<String, StoreError> {
        self.write_record(SnapshotRecord::new(Utc::now(), temperature)).await
    }

    pub async fn write_record(&self, record: SnapshotRecord) -> Result<String, StoreError> {
        let name = record.object_name();
        let body = serde_json::to_vec(&record)
            .map_err(|e| StoreError(format!("failed to serialise snapshot: {e}")))?;

        self.store.put_object(&self.bucket, &name, body).await?;
        info!(bucket = %self.bucket, object = %name, temperature = record.temperature, "Snapshot stored");
        Ok(name)
    }
}
