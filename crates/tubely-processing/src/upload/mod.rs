//! Upload orchestration: ownership check, publishing and the pipeline that
//! ties the stages together.

pub mod gate;
pub mod pipeline;
pub mod publisher;

pub use gate::OwnershipGate;
pub use pipeline::{PipelineConfig, PipelineStage, UploadPipeline, UploadRun};
pub use publisher::AssetPublisher;
