//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use tubely_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tubely API",
        version = "0.1.0",
        description = "Upload thumbnails and videos for existing video records. Thumbnails are served from /assets; videos are stored in an object store and returned as short-lived signed URLs."
    ),
    paths(
        handlers::thumbnail_upload::upload_thumbnail,
        handlers::video_upload::upload_video,
        handlers::video_get::get_video,
        handlers::health::health,
    ),
    components(
        schemas(
            models::AssetRecord,
            handlers::health::HealthResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "videos", description = "Video media upload and retrieval"),
        (name = "health", description = "Liveness check")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
