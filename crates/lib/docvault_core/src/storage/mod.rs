//! Object Storage Gateway.
//!
//! Documents reference blobs by key; this module issues time-limited URLs
//! for them and deletes them. Bytes never pass through Docvault.

pub mod memory;
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

pub use memory::MemoryStorage;
pub use s3::S3Storage;

/// Upload URL lifetime: 15 minutes.
pub const DEFAULT_UPLOAD_URL_TTL_SECS: i64 = 15 * 60;

/// Download URL lifetime: 1 hour.
pub const DEFAULT_DOWNLOAD_URL_TTL_SECS: i64 = 60 * 60;

/// Object storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage {operation} returned HTTP {status}")]
    Status { operation: &'static str, status: u16 },

    #[error("invalid object key")]
    InvalidKey,

    #[error("storage configuration error: {0}")]
    Config(String),
}

/// Shared handle to the active storage backend.
pub type SharedStorage = Arc<dyn ObjectStorage>;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Presigned `PUT` URL for `key`. The upload must carry `content_type`
    /// as its `Content-Type` header.
    async fn issue_upload_url(&self, key: &str, content_type: &str)
    -> Result<String, StorageError>;

    /// Presigned `GET` URL for `key`.
    async fn issue_download_url(&self, key: &str) -> Result<String, StorageError>;

    /// Delete the blob at `key`. Deleting an absent blob succeeds.
    async fn delete_blob(&self, key: &str) -> Result<(), StorageError>;
}

/// S3-compatible endpoint settings.
#[derive(Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub upload_url_ttl: Duration,
    pub download_url_ttl: Duration,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("upload_url_ttl", &self.upload_url_ttl)
            .field("download_url_ttl", &self.download_url_ttl)
            .finish()
    }
}

impl StorageConfig {
    /// Reads configuration from environment variables with local-dev defaults.
    ///
    /// | Variable        | Default                  |
    /// |-----------------|--------------------------|
    /// | `S3_ENDPOINT`   | `http://localhost:9000`  |
    /// | `S3_REGION`     | `us-east-1`              |
    /// | `S3_BUCKET`     | `docvault`               |
    /// | `S3_ACCESS_KEY` | `minioadmin`             |
    /// | `S3_SECRET_KEY` | `minioadmin`             |
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };
        Self {
            endpoint: var("S3_ENDPOINT", "http://localhost:9000"),
            region: var("S3_REGION", "us-east-1"),
            bucket: var("S3_BUCKET", "docvault"),
            access_key: var("S3_ACCESS_KEY", "minioadmin"),
            secret_key: var("S3_SECRET_KEY", "minioadmin"),
            upload_url_ttl: Duration::seconds(DEFAULT_UPLOAD_URL_TTL_SECS),
            download_url_ttl: Duration::seconds(DEFAULT_DOWNLOAD_URL_TTL_SECS),
        }
    }
}
