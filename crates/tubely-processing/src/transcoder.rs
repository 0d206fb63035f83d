//! Fast-start remux: moves the MP4 index ahead of the media data so players
//! can start before the whole file has downloaded. Streams are copied, never
//! re-encoded.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;

use crate::context::{run_tool, validate_tool_path, ExecutionContext};
use crate::error::ProcessingError;
use crate::ingest::ScratchFile;

/// Suffix of the remuxed sibling of a scratch file.
const PROCESSING_SUFFIX: &str = ".processing";

#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Write a fast-start copy of `input` to `output`.
    async fn remux_faststart(
        &self,
        input: &Path,
        output: &Path,
        ctx: &ExecutionContext,
    ) -> Result<(), ProcessingError>;
}

pub struct FfmpegRemuxer {
    ffmpeg_path: String,
}

impl FfmpegRemuxer {
    pub fn new(ffmpeg_path: impl Into<String>) -> Result<Self> {
        let ffmpeg_path = ffmpeg_path.into();
        validate_tool_path(&ffmpeg_path).context("Invalid ffmpeg_path")?;
        Ok(Self { ffmpeg_path })
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    #[tracing::instrument(skip(self, ctx), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "faststart"
    ))]
    async fn remux_faststart(
        &self,
        input: &Path,
        output: &Path,
        ctx: &ExecutionContext,
    ) -> Result<(), ProcessingError> {
        let start = std::time::Instant::now();

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .arg("-i")
            .arg(input)
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(output);

        let result = run_tool(command, ctx)
            .await
            .map_err(|e| ProcessingError::TranscodeFailed(e.to_string()))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::error!(status = %result.status, stderr = %stderr, "ffmpeg faststart failed");
            return Err(ProcessingError::TranscodeFailed(format!(
                "ffmpeg exited with {}",
                result.status
            )));
        }

        tracing::debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Fast-start remux completed"
        );

        Ok(())
    }
}

#[derive(Clone)]
pub struct FastStartTranscoder {
    remuxer: Arc<dyn Remuxer>,
}

impl FastStartTranscoder {
    pub fn new(remuxer: Arc<dyn Remuxer>) -> Self {
        Self { remuxer }
    }

    /// Remux `input` into `<input>.processing`. The input scratch file is left
    /// for the caller to drop; the output is removed if the remux fails.
    pub async fn transcode(
        &self,
        input: &ScratchFile,
        ctx: &ExecutionContext,
    ) -> Result<ScratchFile, ProcessingError> {
        let output = ScratchFile::claim(input.sibling_path(PROCESSING_SUFFIX));

        self.remuxer
            .remux_faststart(input.path(), output.path(), ctx)
            .await?;

        if !tokio::fs::try_exists(output.path()).await.unwrap_or(false) {
            return Err(ProcessingError::TranscodeFailed(
                "remux produced no output".to_string(),
            ));
        }

        Ok(output)
    }
}
