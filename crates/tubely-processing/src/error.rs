//! Processing errors and their mapping onto `AppError`.

use thiserror::Error;
use tubely_core::AppError;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Scratch storage unavailable: {0}")]
    ScratchUnavailable(#[source] std::io::Error),

    #[error("Failed to read upload: {0}")]
    ReadFailed(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("No video streams found")]
    NoStreams,

    #[error("Invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::PayloadTooLarge { limit } => AppError::PayloadTooLarge { limit },
            ProcessingError::ScratchUnavailable(e) => AppError::StorageUnavailable(e.to_string()),
            ProcessingError::ReadFailed(msg) => {
                AppError::InvalidInput(format!("Couldn't read upload: {}", msg))
            }
            ProcessingError::UnsupportedMediaType(msg) => AppError::UnsupportedMediaType(msg),
            ProcessingError::NoStreams => AppError::NoStreams,
            ProcessingError::InvalidDimensions { width, height } => {
                AppError::InvalidDimensions { width, height }
            }
            ProcessingError::ProbeFailed(msg) => AppError::ProbeFailed(msg),
            ProcessingError::TranscodeFailed(msg) => AppError::TranscodeFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubely_core::ErrorMetadata;

    #[test]
    fn test_mapping_preserves_status_codes() {
        let cases: Vec<(ProcessingError, u16)> = vec![
            (ProcessingError::PayloadTooLarge { limit: 10 }, 413),
            (
                ProcessingError::ScratchUnavailable(std::io::Error::other("disk full")),
                500,
            ),
            (ProcessingError::ReadFailed("truncated".into()), 400),
            (ProcessingError::UnsupportedMediaType("text/plain".into()), 400),
            (ProcessingError::NoStreams, 400),
            (ProcessingError::ProbeFailed("exit 1".into()), 500),
            (ProcessingError::TranscodeFailed("exit 1".into()), 500),
        ];

        for (err, status) in cases {
            let app: AppError = err.into();
            assert_eq!(app.http_status_code(), status, "{app}");
        }
    }
}
