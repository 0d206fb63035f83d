use crate::assets::write_new_file;
use crate::traits::{ByteReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Local filesystem object store for development.
///
/// Objects live at `{base_path}/{bucket}/{key}` and are exposed at
/// `{base_url}/{bucket}/{key}`. Presigned URLs are plain URLs; there is no
/// expiry to enforce on a local directory.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    bucket: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for objects (e.g., "/var/lib/tubely/objects")
    /// * `base_url` - Base URL for serving objects (e.g., "http://localhost:8091/objects")
    /// * `bucket` - Name recorded in object references
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        bucket: String,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            bucket,
        })
    }

    fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        if bucket != self.bucket {
            return Err(StorageError::UnknownBucket(bucket.to_string()));
        }
        Ok(())
    }

    /// Convert storage key to filesystem path.
    ///
    /// Keys may not escape the bucket directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(&self.bucket).join(key))
    }

    fn generate_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket,
            key
        )
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        reader: ByteReader,
    ) -> StorageResult<u64> {
        self.ensure_bucket(bucket)?;
        let path = self.key_to_path(key)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();
        let size = write_new_file(&path, reader).await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(size)
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        self.ensure_bucket(bucket)?;
        self.key_to_path(key)?;
        Ok(self.generate_url(key))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(
            dir,
            "http://localhost:8091/objects".to_string(),
            "local-videos".to_string(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_writes_under_bucket_directory() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let reader: ByteReader = Box::pin(std::io::Cursor::new(b"mp4".to_vec()));
        let size = storage
            .put("local-videos", "landscape/abc.mp4", "video/mp4", reader)
            .await
            .unwrap();

        assert_eq!(size, 3);
        let stored = dir.path().join("local-videos/landscape/abc.mp4");
        assert_eq!(std::fs::read(stored).unwrap(), b"mp4");
    }

    #[tokio::test]
    async fn test_presign_returns_object_url() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let url = storage
            .presign("local-videos", "portrait/abc.mp4", Duration::from_secs(900))
            .await
            .unwrap();

        assert_eq!(
            url,
            "http://localhost:8091/objects/local-videos/portrait/abc.mp4"
        );
    }

    #[tokio::test]
    async fn test_rejects_traversal_and_unknown_bucket() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let reader: ByteReader = Box::pin(std::io::Cursor::new(b"x".to_vec()));
        let err = storage
            .put("local-videos", "../outside.mp4", "video/mp4", reader)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));

        let err = storage
            .presign("other", "a.mp4", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownBucket(_)));
    }
}
