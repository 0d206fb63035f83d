//! Error types module
//!
//! Every failure the upload pipeline can produce is a variant of `AppError`.
//! Crates with their own error enums (storage, processing) convert into it at
//! their boundary, and the API crate renders it through `ErrorMetadata`.
//!
//! The `Database` variant wraps `sqlx::Error` only when the `sqlx` feature is on.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected failures such as validation errors
    Debug,
    /// Client-caused failures worth noticing
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "PROBE_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Scratch storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Media has no video streams")]
    NoStreams,

    #[error("Invalid video dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("Storage write failed: {0}")]
    StorageWriteFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("Invalid ID: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedMediaType(_) => (
            400,
            "UNSUPPORTED_MEDIA_TYPE",
            false,
            Some("Upload a file with a supported content type"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the bearer token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            Some("Only the owner of a video can upload its media"),
            false,
            LogLevel::Warn,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge { .. } => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::StorageUnavailable(_) => (
            500,
            "STORAGE_UNAVAILABLE",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::NoStreams => (
            400,
            "NO_STREAMS",
            false,
            Some("Upload a file containing a video stream"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidDimensions { .. } => (
            400,
            "INVALID_DIMENSIONS",
            false,
            Some("Upload a video with non-zero width and height"),
            false,
            LogLevel::Debug,
        ),
        AppError::ProbeFailed(_) => (
            500,
            "PROBE_FAILED",
            false,
            Some("Check the video file and try again"),
            true,
            LogLevel::Error,
        ),
        AppError::TranscodeFailed(_) => (
            500,
            "TRANSCODE_FAILED",
            false,
            Some("Check the video file and try again"),
            true,
            LogLevel::Error,
        ),
        AppError::StorageWriteFailed(_) => (
            500,
            "STORAGE_WRITE_FAILED",
            true,
            Some("Retry the upload"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge { .. } => "PayloadTooLarge",
            AppError::StorageUnavailable(_) => "StorageUnavailable",
            AppError::NoStreams => "NoStreams",
            AppError::InvalidDimensions { .. } => "InvalidDimensions",
            AppError::ProbeFailed(_) => "ProbeFailed",
            AppError::TranscodeFailed(_) => "TranscodeFailed",
            AppError::StorageWriteFailed(_) => "StorageWriteFailed",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::InvalidInput(msg)
            | AppError::UnsupportedMediaType(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::PayloadTooLarge { limit } => {
                format!("File exceeds the maximum size of {} bytes", limit)
            }
            AppError::StorageUnavailable(_) => "Couldn't buffer upload".to_string(),
            AppError::NoStreams => "Video file has no video stream".to_string(),
            AppError::InvalidDimensions { width, height } => {
                format!("Video has invalid dimensions {}x{}", width, height)
            }
            AppError::ProbeFailed(_) => "Couldn't read video metadata".to_string(),
            AppError::TranscodeFailed(_) => "Couldn't process video".to_string(),
            AppError::StorageWriteFailed(_) => "Couldn't store file".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
