use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use std::sync::Arc;
use tubely_core::constants::VIDEO_FIELD;
use tubely_core::models::{AssetRecord, MediaKind};

use crate::auth::AuthenticatedUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload::run_upload;
use crate::state::AppState;

/// Upload an MP4 for a video the caller owns.
///
/// The file is probed for its aspect ratio, remuxed for fast start and stored
/// under `{aspect}/{token}.mp4`. The response carries a short-lived signed URL.
#[utoipa::path(
    post,
    path = "/api/video_upload/{videoID}",
    tag = "videos",
    params(
        ("videoID" = String, Path, description = "Video ID")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "MP4 file in form field `video`"),
    responses(
        (status = 200, description = "Video stored and recorded", body = AssetRecord),
        (status = 400, description = "Invalid ID, missing field, non-MP4 file or unreadable video", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller does not own the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 413, description = "Video too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    user: Result<AuthenticatedUser, HttpAppError>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AssetRecord>, HttpAppError> {
    let record = run_upload(
        &state,
        user,
        &video_id,
        MediaKind::Video,
        VIDEO_FIELD,
        multipart,
    )
    .await?;

    tracing::info!(video_id = %record.id, "Video uploaded");

    let record = state.publisher().sign_record(record).await?;
    Ok(Json(record))
}
