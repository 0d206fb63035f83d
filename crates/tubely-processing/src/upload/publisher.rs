use std::sync::Arc;
use std::time::Duration;
use tubely_core::models::{AssetRecord, MediaDescriptor, MediaKind, PublishedReference};
use tubely_core::AppError;
use tubely_storage::keys::{asset_filename, video_object_key};
use tubely_storage::{AssetDirectory, ByteReader, Storage, StorageError};

use crate::ingest::ScratchFile;

fn write_failed(err: StorageError) -> AppError {
    AppError::StorageWriteFailed(err.to_string())
}

/// Moves buffered media to its durable home and turns stored references back
/// into fetchable URLs.
///
/// Images go to the local asset directory and are referenced by URL. Videos go
/// to the object store and are referenced as `bucket,key`; the signed URL is
/// minted on every read and never stored.
#[derive(Clone)]
pub struct AssetPublisher {
    assets: AssetDirectory,
    storage: Arc<dyn Storage>,
    signed_url_ttl: Duration,
}

impl AssetPublisher {
    pub fn new(assets: AssetDirectory, storage: Arc<dyn Storage>, signed_url_ttl: Duration) -> Self {
        Self {
            assets,
            storage,
            signed_url_ttl,
        }
    }

    pub fn assets(&self) -> &AssetDirectory {
        &self.assets
    }

    #[tracing::instrument(skip(self, file), fields(media.kind = %descriptor.kind, media.content_type = %descriptor.content_type))]
    pub async fn publish(
        &self,
        file: &ScratchFile,
        descriptor: &MediaDescriptor,
    ) -> Result<PublishedReference, AppError> {
        let reader: ByteReader = Box::pin(file.open().await.map_err(|e| {
            AppError::StorageWriteFailed(format!("Failed to reopen scratch file: {}", e))
        })?);

        match (descriptor.kind, descriptor.aspect) {
            (MediaKind::Image, _) => {
                let filename = asset_filename(&descriptor.extension);
                self.assets
                    .store(&filename, reader)
                    .await
                    .map_err(write_failed)?;
                Ok(PublishedReference::local(self.assets.url_for(&filename)))
            }
            (MediaKind::Video, Some(aspect)) => {
                let bucket = self.storage.bucket().to_string();
                let key = video_object_key(aspect, &descriptor.extension);
                self.storage
                    .put(&bucket, &key, &descriptor.content_type, reader)
                    .await
                    .map_err(write_failed)?;
                Ok(PublishedReference::object(bucket, key))
            }
            (MediaKind::Video, None) => Err(AppError::Internal(
                "Video descriptor is missing its aspect class".to_string(),
            )),
        }
    }

    /// Turn a stored reference into a URL a client can fetch.
    pub async fn resolve(&self, stored: &str) -> Result<String, AppError> {
        match stored.parse::<PublishedReference>()? {
            PublishedReference::LocalAsset { url } => Ok(url),
            PublishedReference::Object { bucket, key } => self
                .storage
                .presign(&bucket, &key, self.signed_url_ttl)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, bucket = %bucket, key = %key, "Failed to sign object URL");
                    AppError::Internal(format!("Couldn't generate presigned URL: {}", e))
                }),
        }
    }

    /// Copy of `record` with `video_url` replaced by a signed URL.
    pub async fn sign_record(&self, mut record: AssetRecord) -> Result<AssetRecord, AppError> {
        if let Some(stored) = record.video_url.take() {
            record.video_url = Some(self.resolve(&stored).await?);
        }
        Ok(record)
    }
}
