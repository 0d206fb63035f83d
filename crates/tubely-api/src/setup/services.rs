//! Service wiring: repository, media tools, publisher and pipeline.

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tubely_core::Config;
use tubely_db::{AssetRepository, PgAssetRepository};
use tubely_processing::{
    AssetPublisher, FastStartTranscoder, FfmpegRemuxer, FfprobeProber, MediaClassifier,
    PipelineConfig, Prober, Remuxer, UploadPipeline,
};
use tubely_storage::{AssetDirectory, Storage};

use crate::auth::JwtValidator;
use crate::state::AppState;

/// Build application state backed by Postgres and the real media tools.
pub async fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let repository: Arc<dyn AssetRepository> = Arc::new(PgAssetRepository::new(pool));
    let prober: Arc<dyn Prober> = Arc::new(FfprobeProber::new(config.ffprobe_path())?);
    let remuxer: Arc<dyn Remuxer> = Arc::new(FfmpegRemuxer::new(config.ffmpeg_path())?);

    build_state(config.clone(), repository, storage, prober, remuxer).await
}

/// Assemble `AppState` from its collaborators.
pub async fn build_state(
    config: Config,
    repository: Arc<dyn AssetRepository>,
    storage: Arc<dyn Storage>,
    prober: Arc<dyn Prober>,
    remuxer: Arc<dyn Remuxer>,
) -> Result<Arc<AppState>> {
    tokio::fs::create_dir_all(config.scratch_dir())
        .await
        .with_context(|| {
            format!(
                "Failed to create scratch directory {}",
                config.scratch_dir().display()
            )
        })?;

    let assets = AssetDirectory::new(config.assets_root().clone(), config.public_base_url())
        .await
        .context("Failed to prepare assets directory")?;

    let pipeline_config = PipelineConfig::from_config(&config);
    let publisher = AssetPublisher::new(
        assets,
        storage,
        Duration::from_secs(config.signed_url_ttl_secs()),
    );
    let pipeline = UploadPipeline::new(
        pipeline_config,
        repository.clone(),
        MediaClassifier::new(prober),
        FastStartTranscoder::new(remuxer),
        publisher,
    );

    tracing::info!(
        assets_root = %config.assets_root().display(),
        scratch_dir = %config.scratch_dir().display(),
        "Upload pipeline initialized"
    );

    Ok(Arc::new(AppState {
        jwt: Arc::new(JwtValidator::new(config.jwt_secret())),
        config,
        repository,
        pipeline: Arc::new(pipeline),
        shutdown: CancellationToken::new(),
    }))
}
