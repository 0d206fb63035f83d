//! Application state shared by all handlers.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tubely_core::Config;
use tubely_db::AssetRepository;
use tubely_processing::{AssetPublisher, UploadPipeline};

use crate::auth::JwtValidator;

pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn AssetRepository>,
    pub pipeline: Arc<UploadPipeline>,
    pub jwt: Arc<JwtValidator>,
    /// Cancelled on shutdown; per-request tool contexts are children of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn publisher(&self) -> &AssetPublisher {
        self.pipeline.publisher()
    }
}
