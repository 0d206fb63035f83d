use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use std::sync::Arc;
use tubely_core::constants::THUMBNAIL_FIELD;
use tubely_core::models::{AssetRecord, MediaKind};

use crate::auth::AuthenticatedUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload::run_upload;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/thumbnail_upload/{videoID}",
    tag = "videos",
    params(
        ("videoID" = String, Path, description = "Video ID")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "Image in form field `thumbnail`"),
    responses(
        (status = 200, description = "Thumbnail stored and recorded", body = AssetRecord),
        (status = 400, description = "Invalid ID, missing field or unsupported image type", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller does not own the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 413, description = "Image too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    user: Result<AuthenticatedUser, HttpAppError>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AssetRecord>, HttpAppError> {
    let record = run_upload(
        &state,
        user,
        &video_id,
        MediaKind::Image,
        THUMBNAIL_FIELD,
        multipart,
    )
    .await?;

    tracing::info!(video_id = %record.id, "Thumbnail uploaded");

    let record = state.publisher().sign_record(record).await?;
    Ok(Json(record))
}
