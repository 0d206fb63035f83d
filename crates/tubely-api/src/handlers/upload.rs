//! Shared multipart handling for the upload endpoints.

use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::Multipart;
use futures::StreamExt;
use std::sync::Arc;
use tubely_core::models::{AssetRecord, MediaKind};
use tubely_core::AppError;
use tubely_processing::{IncomingPart, ProcessingError};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::HttpAppError;
use crate::state::AppState;

/// Parse a path id, rejecting anything that is not a UUID.
pub(crate) fn parse_asset_id(raw: &str) -> Result<Uuid, HttpAppError> {
    Uuid::parse_str(raw)
        .map_err(|e| HttpAppError(AppError::InvalidInput(format!("Invalid ID: {}", e))))
}

fn read_error(err: MultipartError, limit: u64) -> ProcessingError {
    if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        ProcessingError::PayloadTooLarge { limit }
    } else {
        ProcessingError::ReadFailed(err.body_text())
    }
}

/// Authorize, then stream the named field through the upload pipeline.
///
/// The request body is untouched until the ownership check has passed.
pub(crate) async fn run_upload(
    state: &Arc<AppState>,
    user: Result<AuthenticatedUser, HttpAppError>,
    raw_id: &str,
    kind: MediaKind,
    field_name: &str,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AssetRecord, HttpAppError> {
    let asset_id = parse_asset_id(raw_id)?;
    let user = user?;

    let run = state.pipeline.begin(user.user_id, asset_id, kind).await?;

    let mut multipart = multipart.map_err(|e| {
        HttpAppError(AppError::InvalidInput(format!(
            "Couldn't parse multipart form: {}",
            e.body_text()
        )))
    })?;

    let limit = state.pipeline.config().limit_for(kind);
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpAppError::from(read_error(e, limit)))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let content_type = field.content_type().map(String::from);
        let chunks = Box::pin(field.map(move |chunk| chunk.map_err(|e| read_error(e, limit))));

        let ctx = state.pipeline.context(&state.shutdown);
        let record = run
            .complete(IncomingPart::new(content_type, chunks), &ctx)
            .await?;
        return Ok(record);
    }

    Err(HttpAppError(AppError::InvalidInput(format!(
        "Missing form field '{}'",
        field_name
    ))))
}
