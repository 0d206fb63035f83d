use crate::traits::{ByteReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<AmazonS3>,
    bucket: String,
    region: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the standard AWS environment variables.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store: Arc::new(store),
            bucket,
            region,
        })
    }

    /// The client is bound to one bucket at build time.
    fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        if bucket != self.bucket {
            return Err(StorageError::UnknownBucket(bucket.to_string()));
        }
        Ok(())
    }

    fn location(key: &str) -> StorageResult<Path> {
        Path::parse(key).map_err(|e| StorageError::InvalidKey(e.to_string()))
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        mut reader: ByteReader,
    ) -> StorageResult<u64> {
        self.ensure_bucket(bucket)?;
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );

        let store: Arc<dyn ObjectStore> = self.store.clone();
        let mut writer = BufWriter::new(store, location).with_attributes(attributes);

        let copied = tokio::io::copy(&mut reader, &mut writer).await;
        let size = match copied {
            Ok(size) => size,
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(
                        error = %abort_err,
                        bucket = %self.bucket,
                        key = %key,
                        "Failed to abort S3 multipart upload"
                    );
                }
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                return Err(StorageError::UploadFailed(e.to_string()));
            }
        };

        // The object only exists once shutdown completes the upload.
        writer.shutdown().await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed to complete"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            region = %self.region,
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(size)
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.ensure_bucket(bucket)?;
        let location = Self::location(key)?;

        let url = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        Ok(url.to_string())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
