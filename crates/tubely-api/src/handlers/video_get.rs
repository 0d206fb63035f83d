use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tubely_core::models::AssetRecord;
use tubely_core::AppError;

use crate::auth::AuthenticatedUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload::parse_asset_id;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/videos/{videoID}",
    tag = "videos",
    params(
        ("videoID" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video with a signed video URL", body = AssetRecord),
        (status = 400, description = "Invalid ID", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    user: Result<AuthenticatedUser, HttpAppError>,
) -> Result<Json<AssetRecord>, HttpAppError> {
    let video_id = parse_asset_id(&video_id)?;
    let _user = user?;

    let record = state
        .repository
        .get(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Couldn't find video".to_string()))?;

    let record = state.publisher().sign_record(record).await?;
    Ok(Json(record))
}
