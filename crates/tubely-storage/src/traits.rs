//! Storage abstraction trait

use crate::StorageBackend;
use async_trait::async_trait;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Streaming source for uploads.
pub type ByteReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Object store contract used for published videos.
///
/// `put` returns only once the object is durably stored. `presign` never
/// touches the object; it only produces a time-bounded URL for it.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stream `reader` into `bucket/key` with the given content type.
    /// Returns the number of bytes written.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        reader: ByteReader,
    ) -> StorageResult<u64>;

    /// Build a GET URL for `bucket/key` valid for `expires_in`.
    async fn presign(&self, bucket: &str, key: &str, expires_in: Duration)
        -> StorageResult<String>;

    /// Bucket new objects are written to.
    fn bucket(&self) -> &str;

    fn backend_type(&self) -> StorageBackend;
}
