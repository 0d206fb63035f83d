//! Local directory holding published thumbnail images.
//!
//! Files are written once under a fresh random name and never replaced, so an
//! asset URL keeps pointing at the same bytes for as long as the file exists.

use crate::traits::{ByteReader, StorageError, StorageResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tubely_core::constants::ASSETS_ROUTE;

#[derive(Clone, Debug)]
pub struct AssetDirectory {
    root: PathBuf,
    base_url: String,
}

impl AssetDirectory {
    /// # Arguments
    /// * `root` - Directory the files are written to (e.g., "./assets")
    /// * `base_url` - Public origin of the service (e.g., "http://localhost:8091")
    pub async fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create assets directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(AssetDirectory {
            root,
            base_url: base_url.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL of `filename`.
    pub fn url_for(&self, filename: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url.trim_end_matches('/'),
            ASSETS_ROUTE,
            filename
        )
    }

    /// Filenames are flat: no separators, no parent references.
    fn filename_to_path(&self, filename: &str) -> StorageResult<PathBuf> {
        if filename.is_empty()
            || filename.contains("..")
            || filename.contains('/')
            || filename.contains('\\')
        {
            return Err(StorageError::InvalidKey(format!(
                "Invalid asset filename: {}",
                filename
            )));
        }
        Ok(self.root.join(filename))
    }

    /// Write `reader` to `filename`. Fails with `AlreadyExists` instead of
    /// replacing an existing file.
    pub async fn store(&self, filename: &str, reader: ByteReader) -> StorageResult<u64> {
        let path = self.filename_to_path(filename)?;
        let start = std::time::Instant::now();

        let size = write_new_file(&path, reader).await?;

        tracing::info!(
            path = %path.display(),
            filename = %filename,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Asset stored"
        );

        Ok(size)
    }
}

/// Stream `reader` into a file that must not exist yet, syncing before
/// returning. A partially written file is removed on failure.
pub(crate) async fn write_new_file(path: &Path, mut reader: ByteReader) -> StorageResult<u64> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                StorageError::AlreadyExists(path.display().to_string())
            }
            _ => StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                path.display(),
                e
            )),
        })?;

    let written = async {
        let size = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok::<u64, std::io::Error>(size)
    }
    .await;

    match written {
        Ok(size) => Ok(size),
        Err(e) => {
            drop(file);
            if let Err(remove_err) = fs::remove_file(path).await {
                tracing::warn!(
                    error = %remove_err,
                    path = %path.display(),
                    "Failed to remove partially written file"
                );
            }
            Err(StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn reader(bytes: &[u8]) -> ByteReader {
        Box::pin(std::io::Cursor::new(bytes.to_vec()))
    }

    #[tokio::test]
    async fn test_store_writes_bytes_and_builds_url() {
        let dir = tempdir().unwrap();
        let assets = AssetDirectory::new(dir.path(), "http://localhost:8091/")
            .await
            .unwrap();

        let size = assets.store("abc.png", reader(b"png-bytes")).await.unwrap();

        assert_eq!(size, 9);
        assert_eq!(
            std::fs::read(dir.path().join("abc.png")).unwrap(),
            b"png-bytes"
        );
        assert_eq!(
            assets.url_for("abc.png"),
            "http://localhost:8091/assets/abc.png"
        );
    }

    #[tokio::test]
    async fn test_store_never_overwrites() {
        let dir = tempdir().unwrap();
        let assets = AssetDirectory::new(dir.path(), "http://localhost:8091")
            .await
            .unwrap();

        assets.store("abc.png", reader(b"first")).await.unwrap();
        let err = assets.store("abc.png", reader(b"second")).await.unwrap_err();

        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(std::fs::read(dir.path().join("abc.png")).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_store_rejects_path_components() {
        let dir = tempdir().unwrap();
        let assets = AssetDirectory::new(dir.path(), "http://localhost:8091")
            .await
            .unwrap();

        for name in ["../escape.png", "nested/a.png", ""] {
            let err = assets.store(name, reader(b"x")).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "{name}");
        }
    }
}
