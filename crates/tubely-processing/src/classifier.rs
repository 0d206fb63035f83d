//! Video classification - ffprobe metadata and aspect bucketing

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tubely_core::models::{AspectClass, MediaDescriptor};

use crate::context::{run_tool, validate_tool_path, ExecutionContext, ToolError};
use crate::error::ProcessingError;
use crate::ingest::DeclaredMedia;

/// Allowed distance between a measured ratio and 16:9 or 9:16.
const ASPECT_TOLERANCE: f64 = 0.05;

/// The subset of `ffprobe -print_format json -show_streams` output we read.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProbeReport {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProbeStream {
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl ProbeReport {
    /// Dimensions of the first video stream. Streams without a `codec_type`
    /// count as video.
    pub fn video_dimensions(&self) -> Result<(u32, u32), ProcessingError> {
        let stream = self
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref().map_or(true, |t| t == "video"))
            .ok_or(ProcessingError::NoStreams)?;

        if stream.width == 0 || stream.height == 0 {
            return Err(ProcessingError::InvalidDimensions {
                width: stream.width,
                height: stream.height,
            });
        }

        Ok((stream.width, stream.height))
    }
}

/// Reads stream metadata from a media file.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, path: &Path, ctx: &ExecutionContext)
        -> Result<ProbeReport, ProcessingError>;
}

pub struct FfprobeProber {
    ffprobe_path: String,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<String>) -> Result<Self> {
        let ffprobe_path = ffprobe_path.into();
        validate_tool_path(&ffprobe_path).context("Invalid ffprobe_path")?;
        Ok(Self { ffprobe_path })
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    #[tracing::instrument(skip(self, ctx), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn probe(
        &self,
        path: &Path,
        ctx: &ExecutionContext,
    ) -> Result<ProbeReport, ProcessingError> {
        let start = std::time::Instant::now();

        let mut command = Command::new(&self.ffprobe_path);
        command
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path);

        let output = run_tool(command, ctx)
            .await
            .map_err(|e: ToolError| ProcessingError::ProbeFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(status = %output.status, stderr = %stderr, "ffprobe failed");
            return Err(ProcessingError::ProbeFailed(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let report: ProbeReport = serde_json::from_slice(&output.stdout).map_err(|e| {
            ProcessingError::ProbeFailed(format!("Failed to parse ffprobe output: {}", e))
        })?;

        tracing::debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            stream_count = report.streams.len(),
            "Video probe completed"
        );

        Ok(report)
    }
}

/// Bucket `width / height` into landscape (16:9), portrait (9:16) or other.
pub fn classify_aspect(width: u32, height: u32) -> AspectClass {
    if height == 0 {
        return AspectClass::Other;
    }

    let ratio = width as f64 / height as f64;
    if (ratio - 16.0 / 9.0).abs() < ASPECT_TOLERANCE {
        AspectClass::Landscape
    } else if (ratio - 9.0 / 16.0).abs() < ASPECT_TOLERANCE {
        AspectClass::Portrait
    } else {
        AspectClass::Other
    }
}

/// Turns a buffered video into a `MediaDescriptor`.
#[derive(Clone)]
pub struct MediaClassifier {
    prober: Arc<dyn Prober>,
}

impl MediaClassifier {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober }
    }

    pub async fn classify_video(
        &self,
        path: &Path,
        declared: &DeclaredMedia,
        ctx: &ExecutionContext,
    ) -> Result<MediaDescriptor, ProcessingError> {
        let report = self.prober.probe(path, ctx).await?;
        let (width, height) = report.video_dimensions()?;
        let aspect = classify_aspect(width, height);

        tracing::debug!(width, height, aspect = %aspect, "Video classified");

        Ok(MediaDescriptor::video(
            declared.content_type.clone(),
            declared.extension.clone(),
            aspect,
        ))
    }
}
