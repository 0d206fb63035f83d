//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`. Anything that converts into
//! `AppError` converts into `HttpAppError` and renders the same JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tubely_core::{AppError, Config, ErrorMetadata, LogLevel};
use tubely_processing::ProcessingError;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper so `IntoResponse` can be implemented for the core error type.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<ProcessingError> for HttpAppError {
    fn from(err: ProcessingError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

// Hidden until setup has read the environment from `Config`.
static SHOW_ERROR_DETAILS: AtomicBool = AtomicBool::new(false);

/// Allow error details in responses unless `config` is a production config.
pub fn configure_error_details(config: &Config) {
    SHOW_ERROR_DETAILS.store(!config.is_production(), Ordering::Relaxed);
}

fn error_details_enabled() -> bool {
    SHOW_ERROR_DETAILS.load(Ordering::Relaxed)
}

fn error_body(app_error: &AppError, details_enabled: bool) -> ErrorResponse {
    // Sensitive errors never carry details.
    let show_details = details_enabled && !app_error.is_sensitive();

    ErrorResponse {
        error: app_error.client_message(),
        details: show_details.then(|| app_error.detailed_message()),
        error_type: show_details.then(|| app_error.error_type().to_string()),
        code: app_error.error_code().to_string(),
        recoverable: app_error.is_recoverable(),
        suggested_action: app_error.suggested_action().map(String::from),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = error_body(app_error, error_details_enabled());

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = HttpAppError(err).into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_client_error_carries_message() {
        let (status, body) = render(AppError::Forbidden("Not authorized to update this video".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Not authorized to update this video");
    }

    #[tokio::test]
    async fn test_server_error_hides_details() {
        let (status, body) = render(AppError::TranscodeFailed("ffmpeg: moov atom not found".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("details").is_none());
        assert!(!body["error"].as_str().unwrap().contains("moov"));
    }

    #[test]
    fn test_details_follow_configured_mode() {
        let err = AppError::UnsupportedMediaType("text/plain".into());

        let body = error_body(&err, true);
        assert!(body.details.unwrap().contains("text/plain"));
        assert_eq!(body.error_type.as_deref(), Some(err.error_type()));

        let body = error_body(&err, false);
        assert!(body.details.is_none());
        assert!(body.error_type.is_none());
        assert_eq!(body.code, err.error_code());
    }

    #[test]
    fn test_sensitive_errors_never_carry_details() {
        let body = error_body(&AppError::ProbeFailed("ffprobe exit 1".into()), true);
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_payload_too_large_status() {
        let (status, _) = render(AppError::PayloadTooLarge { limit: 10 }).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
