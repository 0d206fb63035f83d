//! Tubely Media Processing Library
//!
//! The upload-and-publish pipeline and the pieces it is built from:
//!
//! - [`ingest`]: content-type validation and the byte-capped scratch buffer
//! - [`classifier`]: ffprobe-backed aspect classification
//! - [`transcoder`]: ffmpeg faststart remux
//! - [`upload`]: ownership gate, publisher and the pipeline state machine
//!
//! External tools run under an [`ExecutionContext`] carrying a deadline and a
//! cancellation token.

pub mod classifier;
pub mod context;
pub mod error;
pub mod ingest;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod transcoder;
pub mod upload;

// Re-export commonly used types
pub use classifier::{classify_aspect, FfprobeProber, MediaClassifier, ProbeReport, Prober};
pub use context::ExecutionContext;
pub use error::ProcessingError;
pub use ingest::{validate_content_type, DeclaredMedia, IncomingPart, IngestBuffer, ScratchFile};
pub use transcoder::{FastStartTranscoder, FfmpegRemuxer, Remuxer};
pub use upload::{
    AssetPublisher, OwnershipGate, PipelineConfig, PipelineStage, UploadPipeline, UploadRun,
};
