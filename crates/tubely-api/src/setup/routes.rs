//! Route configuration and setup

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tubely_core::constants::ASSETS_ROUTE;
use tubely_core::{Config, StorageBackend};
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::constants::{API_PREFIX, MULTIPART_OVERHEAD_BYTES, OBJECTS_ROUTE};
use crate::handlers;
use crate::state::AppState;

/// Body limit for a route accepting media of at most `max_bytes`.
fn body_limit(max_bytes: u64) -> DefaultBodyLimit {
    let limit = usize::try_from(max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    DefaultBodyLimit::max(limit)
}

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    crate::error::configure_error_details(config);

    let limits = state.pipeline.config();

    let api_routes = Router::new()
        .route("/healthz", get(handlers::health::health))
        .route(
            "/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route(
            "/thumbnail_upload/{videoID}",
            post(handlers::thumbnail_upload::upload_thumbnail)
                .layer(body_limit(limits.max_thumbnail_bytes)),
        )
        .route(
            "/video_upload/{videoID}",
            post(handlers::video_upload::upload_video).layer(body_limit(limits.max_video_bytes)),
        )
        .route("/videos/{videoID}", get(handlers::video_get::get_video))
        .with_state(state.clone());

    let mut app = Router::new()
        .nest(API_PREFIX, api_routes)
        .nest_service(ASSETS_ROUTE, ServeDir::new(state.publisher().assets().root()));

    if config.storage_backend() == StorageBackend::Local {
        if let Some(path) = config.local_storage_path() {
            app = app.nest_service(OBJECTS_ROUTE, ServeDir::new(path));
        }
    }

    Ok(app.layer(TraceLayer::new_for_http()))
}
