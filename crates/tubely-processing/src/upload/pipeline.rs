//! Upload pipeline state machine.
//!
//! ```text
//! Authorizing -> Buffering -> Classifying -> [Transcoding] -> Publishing -> Committing -> Done
//!       \            \             \               \              \             \
//!        +------------+-------------+---------------+--------------+-------------+--> Failed
//! ```
//!
//! `UploadPipeline::begin` runs Authorizing only, so the caller can reject a
//! request before reading its body. `UploadRun::complete` drives the rest.
//! Classifying and Transcoding apply to video only.
//!
//! Scratch files are owned by `ScratchFile` guards local to `complete`, so
//! every exit path removes them. The record is written once, in Committing,
//! and only after the published bytes are durable.

use bytes::Bytes;
use futures::Stream;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tubely_core::models::{AssetRecord, MediaDescriptor, MediaKind, PublishedReference};
use tubely_core::{AppError, Config};
use tubely_db::AssetRepository;
use uuid::Uuid;

use super::gate::OwnershipGate;
use super::publisher::AssetPublisher;
use crate::classifier::MediaClassifier;
use crate::context::ExecutionContext;
use crate::error::ProcessingError;
use crate::ingest::{validate_content_type, IncomingPart, IngestBuffer};
use crate::transcoder::FastStartTranscoder;

/// Pipeline settings taken from `Config` once at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub scratch_dir: PathBuf,
    pub max_thumbnail_bytes: u64,
    pub max_video_bytes: u64,
    pub tool_timeout: Duration,
    pub signed_url_ttl: Duration,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scratch_dir: config.scratch_dir().clone(),
            max_thumbnail_bytes: config.max_thumbnail_size_bytes(),
            max_video_bytes: config.max_video_size_bytes(),
            tool_timeout: Duration::from_secs(config.media_tool_timeout_secs()),
            signed_url_ttl: Duration::from_secs(config.signed_url_ttl_secs()),
        }
    }

    pub fn limit_for(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.max_thumbnail_bytes,
            MediaKind::Video => self.max_video_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Authorizing,
    Buffering,
    Classifying,
    Transcoding,
    Publishing,
    Committing,
    Done,
    Failed,
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            PipelineStage::Authorizing => "authorizing",
            PipelineStage::Buffering => "buffering",
            PipelineStage::Classifying => "classifying",
            PipelineStage::Transcoding => "transcoding",
            PipelineStage::Publishing => "publishing",
            PipelineStage::Committing => "committing",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub struct UploadPipeline {
    config: PipelineConfig,
    gate: OwnershipGate,
    repository: Arc<dyn AssetRepository>,
    ingest: IngestBuffer,
    classifier: MediaClassifier,
    transcoder: FastStartTranscoder,
    publisher: AssetPublisher,
}

impl UploadPipeline {
    pub fn new(
        config: PipelineConfig,
        repository: Arc<dyn AssetRepository>,
        classifier: MediaClassifier,
        transcoder: FastStartTranscoder,
        publisher: AssetPublisher,
    ) -> Self {
        Self {
            ingest: IngestBuffer::new(config.scratch_dir.clone()),
            gate: OwnershipGate::new(repository.clone()),
            config,
            repository,
            classifier,
            transcoder,
            publisher,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn publisher(&self) -> &AssetPublisher {
        &self.publisher
    }

    /// Execution context for one request, cancelled along with `parent`.
    pub fn context(&self, parent: &CancellationToken) -> ExecutionContext {
        ExecutionContext::with_parent(self.config.tool_timeout, parent)
    }

    /// Authorize `principal` to upload `kind` media to `asset_id`.
    pub async fn begin(
        &self,
        principal: Uuid,
        asset_id: Uuid,
        kind: MediaKind,
    ) -> Result<UploadRun<'_>, AppError> {
        tracing::debug!(stage = %PipelineStage::Authorizing, asset_id = %asset_id, media.kind = %kind, "Upload stage");

        let record = self
            .gate
            .authorize(principal, asset_id)
            .await
            .inspect_err(|e| {
                tracing::debug!(stage = %PipelineStage::Authorizing, error = %e, "Upload failed");
            })?;

        Ok(UploadRun {
            pipeline: self,
            record,
            kind,
            stage: PipelineStage::Authorizing,
        })
    }
}

/// An authorized upload waiting for its body.
pub struct UploadRun<'a> {
    pipeline: &'a UploadPipeline,
    record: AssetRecord,
    kind: MediaKind,
    stage: PipelineStage,
}

impl UploadRun<'_> {
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Buffer, classify, publish and commit `part`. Returns the committed
    /// record with the stored (unsigned) reference.
    #[tracing::instrument(skip_all, fields(asset_id = %self.record.id, media.kind = %self.kind))]
    pub async fn complete<S>(
        mut self,
        part: IncomingPart<S>,
        ctx: &ExecutionContext,
    ) -> Result<AssetRecord, AppError>
    where
        S: Stream<Item = Result<Bytes, ProcessingError>> + Unpin + Send,
    {
        let start = std::time::Instant::now();

        match self.run(part, ctx).await {
            Ok(record) => {
                self.advance(PipelineStage::Done);
                tracing::info!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Upload completed"
                );
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(
                    stage = %self.stage,
                    to = %PipelineStage::Failed,
                    error = %e,
                    "Upload failed"
                );
                Err(e)
            }
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        tracing::debug!(from = %self.stage, to = %next, "Upload stage");
        self.stage = next;
    }

    async fn run<S>(
        &mut self,
        part: IncomingPart<S>,
        ctx: &ExecutionContext,
    ) -> Result<AssetRecord, AppError>
    where
        S: Stream<Item = Result<Bytes, ProcessingError>> + Unpin + Send,
    {
        let pipeline = self.pipeline;

        self.advance(PipelineStage::Buffering);
        let declared = validate_content_type(self.kind, part.content_type.as_deref())?;
        let buffered = pipeline
            .ingest
            .ingest(
                part.chunks,
                pipeline.config.limit_for(self.kind),
                &declared.extension,
            )
            .await?;

        let reference = match self.kind {
            MediaKind::Image => {
                let descriptor =
                    MediaDescriptor::image(declared.content_type, declared.extension);
                self.advance(PipelineStage::Publishing);
                pipeline.publisher.publish(&buffered, &descriptor).await?
            }
            MediaKind::Video => {
                self.advance(PipelineStage::Classifying);
                let descriptor = pipeline
                    .classifier
                    .classify_video(buffered.path(), &declared, ctx)
                    .await?;

                self.advance(PipelineStage::Transcoding);
                let processed = pipeline.transcoder.transcode(&buffered, ctx).await?;

                self.advance(PipelineStage::Publishing);
                pipeline.publisher.publish(&processed, &descriptor).await?
            }
        };

        self.advance(PipelineStage::Committing);
        self.commit(reference).await
    }

    /// Write `reference` into the freshest copy of the record.
    async fn commit(&self, reference: PublishedReference) -> Result<AssetRecord, AppError> {
        let stored = reference.to_string();

        let result = self.write_reference(&stored).await;
        if let Err(e) = &result {
            tracing::error!(
                error = %e,
                asset_id = %self.record.id,
                orphaned_reference = %stored,
                "Published media but failed to update record"
            );
        }

        result
    }

    async fn write_reference(&self, stored: &str) -> Result<AssetRecord, AppError> {
        let repository = &self.pipeline.repository;
        let mut record = repository
            .get(self.record.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Couldn't find video".to_string()))?;

        match self.kind {
            MediaKind::Image => record.thumbnail_url = Some(stored.to_string()),
            MediaKind::Video => record.video_url = Some(stored.to_string()),
        }

        repository.update(&record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CopyRemuxer, FakeProber, MemoryRepository, MemoryStorage};
    use futures::stream;
    use tempfile::{tempdir, TempDir};
    use tubely_storage::AssetDirectory;

    struct Fixture {
        dir: TempDir,
        pipeline: UploadPipeline,
        repository: Arc<MemoryRepository>,
        storage: Arc<MemoryStorage>,
        owner: Uuid,
        asset_id: Uuid,
    }

    impl Fixture {
        fn scratch_dir(&self) -> PathBuf {
            self.dir.path().join("scratch")
        }

        fn scratch_entries(&self) -> usize {
            std::fs::read_dir(self.scratch_dir()).unwrap().count()
        }
    }

    async fn fixture_with(repository: MemoryRepository, storage: MemoryStorage) -> Fixture {
        let dir = tempdir().unwrap();
        let scratch_dir = dir.path().join("scratch");
        std::fs::create_dir_all(&scratch_dir).unwrap();

        let owner = Uuid::new_v4();
        repository
            .create(&AssetRecord::new(owner, "clip"))
            .await
            .unwrap();
        let asset_id = repository.only_id();

        let repository = Arc::new(repository);
        let storage = Arc::new(storage);
        let assets = AssetDirectory::new(dir.path().join("assets"), "http://localhost:8091")
            .await
            .unwrap();

        let config = PipelineConfig {
            scratch_dir,
            max_thumbnail_bytes: 16,
            max_video_bytes: 64,
            tool_timeout: Duration::from_secs(5),
            signed_url_ttl: Duration::from_secs(900),
        };

        let pipeline = UploadPipeline::new(
            config.clone(),
            repository.clone(),
            MediaClassifier::new(Arc::new(FakeProber::dimensions(1920, 1080))),
            FastStartTranscoder::new(Arc::new(CopyRemuxer)),
            AssetPublisher::new(assets, storage.clone(), config.signed_url_ttl),
        );

        Fixture {
            dir,
            pipeline,
            repository,
            storage,
            owner,
            asset_id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(MemoryRepository::default(), MemoryStorage::default()).await
    }

    fn part(
        content_type: &str,
        body: &'static [u8],
    ) -> IncomingPart<impl Stream<Item = Result<Bytes, ProcessingError>> + Unpin + Send> {
        IncomingPart::new(
            Some(content_type.to_string()),
            stream::iter(vec![Ok(Bytes::from_static(body))]),
        )
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_thumbnail_upload_commits_local_url() {
        let f = fixture().await;

        let run = f
            .pipeline
            .begin(f.owner, f.asset_id, MediaKind::Image)
            .await
            .unwrap();
        assert_eq!(run.stage(), PipelineStage::Authorizing);

        let record = run.complete(part("image/png", b"png"), &ctx()).await.unwrap();

        let url = record.thumbnail_url.clone().unwrap();
        let filename = url.strip_prefix("http://localhost:8091/assets/").unwrap();
        assert!(filename.ends_with(".png"));
        assert_eq!(
            std::fs::read(f.dir.path().join("assets").join(filename)).unwrap(),
            b"png"
        );
        assert_eq!(f.repository.snapshot(f.asset_id).unwrap(), record);
        assert_eq!(f.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_video_upload_commits_object_reference() {
        let f = fixture().await;

        let run = f
            .pipeline
            .begin(f.owner, f.asset_id, MediaKind::Video)
            .await
            .unwrap();
        let record = run.complete(part("video/mp4", b"mp4-data"), &ctx()).await.unwrap();

        let stored = record.video_url.clone().unwrap();
        assert!(stored.starts_with("tubely-test,landscape/"));
        let objects = f.storage.objects.lock().unwrap();
        assert_eq!(objects.get(&stored).unwrap().1, b"mp4-data");
        assert_eq!(f.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_non_owner_is_rejected_before_body() {
        let f = fixture().await;
        let result = f
            .pipeline
            .begin(Uuid::new_v4(), f.asset_id, MediaKind::Image)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_wrong_content_type_writes_nothing() {
        let f = fixture().await;
        let before = f.repository.snapshot(f.asset_id).unwrap();

        let run = f
            .pipeline
            .begin(f.owner, f.asset_id, MediaKind::Video)
            .await
            .unwrap();
        let err = run
            .complete(part("video/quicktime", b"mov"), &ctx())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
        assert_eq!(f.repository.snapshot(f.asset_id).unwrap(), before);
        assert_eq!(f.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_oversized_thumbnail_is_rejected() {
        let f = fixture().await;

        let run = f
            .pipeline
            .begin(f.owner, f.asset_id, MediaKind::Image)
            .await
            .unwrap();
        let err = run
            .complete(part("image/png", b"0123456789abcdefX"), &ctx())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge { limit: 16 }));
        assert_eq!(f.scratch_entries(), 0);
        assert_eq!(
            std::fs::read_dir(f.dir.path().join("assets"))
                .unwrap()
                .count(),
            0
        );
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_record_untouched() {
        let f = fixture_with(
            MemoryRepository::default(),
            MemoryStorage {
                fail_puts: true,
                ..Default::default()
            },
        )
        .await;
        let before = f.repository.snapshot(f.asset_id).unwrap();

        let run = f
            .pipeline
            .begin(f.owner, f.asset_id, MediaKind::Video)
            .await
            .unwrap();
        let err = run.complete(part("video/mp4", b"mp4"), &ctx()).await.unwrap_err();

        assert!(matches!(err, AppError::StorageWriteFailed(_)));
        assert_eq!(f.repository.snapshot(f.asset_id).unwrap(), before);
        assert_eq!(f.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_commit_failure_is_reported() {
        let f = fixture_with(
            MemoryRepository {
                fail_updates: true,
                ..Default::default()
            },
            MemoryStorage::default(),
        )
        .await;

        let run = f
            .pipeline
            .begin(f.owner, f.asset_id, MediaKind::Image)
            .await
            .unwrap();
        let err = run.complete(part("image/png", b"png"), &ctx()).await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(f.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_commit_keeps_concurrent_thumbnail_change() {
        let f = fixture().await;

        let run = f
            .pipeline
            .begin(f.owner, f.asset_id, MediaKind::Video)
            .await
            .unwrap();

        // Another request sets the thumbnail after this one was authorized.
        let mut concurrent = f.repository.snapshot(f.asset_id).unwrap();
        concurrent.thumbnail_url = Some("http://localhost:8091/assets/new.png".to_string());
        f.repository.update(&concurrent).await.unwrap();

        let record = run.complete(part("video/mp4", b"mp4"), &ctx()).await.unwrap();
        assert_eq!(record.thumbnail_url, concurrent.thumbnail_url);
        assert!(record.video_url.is_some());
    }

    #[test]
    fn test_limit_for_kind() {
        let config = PipelineConfig {
            scratch_dir: PathBuf::from("/tmp"),
            max_thumbnail_bytes: 10,
            max_video_bytes: 20,
            tool_timeout: Duration::from_secs(1),
            signed_url_ttl: Duration::from_secs(1),
        };
        assert_eq!(config.limit_for(MediaKind::Image), 10);
        assert_eq!(config.limit_for(MediaKind::Video), 20);
    }
}
