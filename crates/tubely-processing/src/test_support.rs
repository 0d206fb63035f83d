//! In-memory collaborators for pipeline tests.
//!
//! Compiled for this crate's unit tests and, through the `test-support`
//! feature, for the API integration tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tubely_core::models::AssetRecord;
use tubely_core::{AppError, StorageBackend};
use tubely_db::AssetRepository;
use tubely_storage::{ByteReader, Storage, StorageError, StorageResult};
use uuid::Uuid;

use crate::classifier::{ProbeReport, ProbeStream, Prober};
use crate::context::ExecutionContext;
use crate::error::ProcessingError;
use crate::transcoder::Remuxer;

#[derive(Default)]
pub struct MemoryRepository {
    pub records: Mutex<HashMap<Uuid, AssetRecord>>,
    pub fail_updates: bool,
}

impl MemoryRepository {
    pub fn with_record(record: AssetRecord) -> Self {
        let repository = Self::default();
        repository.records.lock().unwrap().insert(record.id, record);
        repository
    }

    pub fn only_id(&self) -> Uuid {
        *self.records.lock().unwrap().keys().next().unwrap()
    }

    pub fn snapshot(&self, id: Uuid) -> Option<AssetRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl AssetRepository for MemoryRepository {
    async fn get(&self, id: Uuid) -> Result<Option<AssetRecord>, AppError> {
        Ok(self.snapshot(id))
    }

    async fn create(&self, record: &AssetRecord) -> Result<AssetRecord, AppError> {
        self.records
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn update(&self, record: &AssetRecord) -> Result<AssetRecord, AppError> {
        if self.fail_updates {
            return Err(AppError::Internal("connection closed".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(record.clone())
            }
            None => Err(AppError::NotFound("Couldn't find video".to_string())),
        }
    }
}

/// Bucket reported by [`MemoryStorage`].
pub const TEST_BUCKET: &str = "tubely-test";

/// Object store keeping `(content_type, bytes)` per `bucket,key`.
#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    pub fail_puts: bool,
}

impl MemoryStorage {
    pub fn object(&self, reference: &str) -> Option<(String, Vec<u8>)> {
        self.objects.lock().unwrap().get(reference).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        mut reader: ByteReader,
    ) -> StorageResult<u64> {
        if self.fail_puts {
            return Err(StorageError::BackendError("bucket unreachable".to_string()));
        }
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await?;
        let size = body.len() as u64;
        self.objects.lock().unwrap().insert(
            format!("{},{}", bucket, key),
            (content_type.to_string(), body),
        );
        Ok(size)
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!(
            "https://{}.example.test/{}?expires={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }

    fn bucket(&self) -> &str {
        TEST_BUCKET
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// Prober returning a fixed report.
pub struct FakeProber {
    report: ProbeReport,
}

impl FakeProber {
    pub fn dimensions(width: u32, height: u32) -> Self {
        Self {
            report: ProbeReport {
                streams: vec![ProbeStream {
                    codec_type: Some("video".to_string()),
                    width,
                    height,
                }],
            },
        }
    }

    pub fn without_streams() -> Self {
        Self {
            report: ProbeReport::default(),
        }
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(
        &self,
        _path: &Path,
        _ctx: &ExecutionContext,
    ) -> Result<ProbeReport, ProcessingError> {
        Ok(self.report.clone())
    }
}

/// Remuxer that copies the input unchanged.
pub struct CopyRemuxer;

#[async_trait]
impl Remuxer for CopyRemuxer {
    async fn remux_faststart(
        &self,
        input: &Path,
        output: &Path,
        _ctx: &ExecutionContext,
    ) -> Result<(), ProcessingError> {
        tokio::fs::copy(input, output)
            .await
            .map_err(|e| ProcessingError::TranscodeFailed(e.to_string()))?;
        Ok(())
    }
}
