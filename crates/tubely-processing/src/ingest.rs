//! Inbound upload handling: content-type validation and scratch buffering.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tubely_core::constants::VIDEO_CONTENT_TYPE;
use tubely_core::models::MediaKind;

use crate::error::ProcessingError;

/// Temporary file owned by one upload. Removed from disk when dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Take ownership of `path`, which may not exist yet.
    pub fn claim(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a sibling named `<this path><suffix>`.
    pub fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.path.clone().into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Open the file for reading from the start.
    pub async fn open(&self) -> std::io::Result<tokio::fs::File> {
        tokio::fs::File::open(&self.path).await
    }

    pub async fn len(&self) -> std::io::Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed scratch file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to remove scratch file"
            ),
        }
    }
}

/// One multipart part: its declared content type and its body chunks.
pub struct IncomingPart<S> {
    pub content_type: Option<String>,
    pub chunks: S,
}

impl<S> IncomingPart<S>
where
    S: Stream<Item = Result<Bytes, ProcessingError>> + Unpin,
{
    pub fn new(content_type: Option<String>, chunks: S) -> Self {
        Self {
            content_type,
            chunks,
        }
    }
}

/// A content type that passed validation for an upload target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredMedia {
    pub kind: MediaKind,
    /// Header value as sent, parameters included. Stored objects carry it.
    pub content_type: String,
    pub extension: String,
}

/// Strip parameters and lowercase, e.g. `Image/PNG; q=1` → `image/png`.
fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Check the declared content type of a part against the upload target.
///
/// Thumbnails accept any `image/<subtype>` whose subtype is alphanumeric (it
/// becomes the file extension). Videos accept exactly `video/mp4`. Only the
/// header is inspected, never the bytes. Checks run on the normalized value;
/// the returned `content_type` keeps the header as declared.
pub fn validate_content_type(
    target: MediaKind,
    declared: Option<&str>,
) -> Result<DeclaredMedia, ProcessingError> {
    let raw = declared.unwrap_or("");
    let content_type = normalize_mime_type(raw);

    let (top, sub) = match content_type.split_once('/') {
        Some((top, sub)) if !top.is_empty() && !sub.is_empty() && !sub.contains('/') => {
            (top, sub)
        }
        _ => {
            return Err(ProcessingError::UnsupportedMediaType(format!(
                "Invalid Content-Type: {:?}",
                raw
            )))
        }
    };

    match target {
        MediaKind::Image => {
            if top != "image" || !sub.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ProcessingError::UnsupportedMediaType(format!(
                    "Invalid file type {}, expected an image",
                    content_type
                )));
            }
            Ok(DeclaredMedia {
                kind: MediaKind::Image,
                extension: sub.to_string(),
                content_type: raw.trim().to_string(),
            })
        }
        MediaKind::Video => {
            if content_type != VIDEO_CONTENT_TYPE {
                return Err(ProcessingError::UnsupportedMediaType(format!(
                    "Invalid file type {}, expected {}",
                    content_type, VIDEO_CONTENT_TYPE
                )));
            }
            Ok(DeclaredMedia {
                kind: MediaKind::Video,
                extension: "mp4".to_string(),
                content_type: raw.trim().to_string(),
            })
        }
    }
}

/// Spills upload streams to scratch files under a fixed directory.
#[derive(Debug, Clone)]
pub struct IngestBuffer {
    scratch_dir: PathBuf,
}

impl IngestBuffer {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Copy `chunks` into a new scratch file, failing with `PayloadTooLarge`
    /// as soon as more than `max_bytes` have arrived. On any error the partial
    /// file is removed before returning.
    #[tracing::instrument(skip(self, chunks), fields(scratch_dir = %self.scratch_dir.display()))]
    pub async fn ingest<S>(
        &self,
        mut chunks: S,
        max_bytes: u64,
        extension: &str,
    ) -> Result<ScratchFile, ProcessingError>
    where
        S: Stream<Item = Result<Bytes, ProcessingError>> + Unpin,
    {
        let (file, scratch) = self.create_scratch(extension)?;
        let mut file = tokio::fs::File::from_std(file);
        let mut total_size: u64 = 0;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            total_size += chunk.len() as u64;
            if total_size > max_bytes {
                tracing::debug!(
                    limit = max_bytes,
                    received = total_size,
                    "Upload exceeded byte ceiling"
                );
                return Err(ProcessingError::PayloadTooLarge { limit: max_bytes });
            }
            file.write_all(&chunk)
                .await
                .map_err(ProcessingError::ScratchUnavailable)?;
        }

        file.flush()
            .await
            .map_err(ProcessingError::ScratchUnavailable)?;

        tracing::debug!(
            path = %scratch.path().display(),
            size_bytes = total_size,
            "Upload buffered"
        );

        Ok(scratch)
    }

    fn create_scratch(
        &self,
        extension: &str,
    ) -> Result<(std::fs::File, ScratchFile), ProcessingError> {
        let suffix = format!(".{}", extension);
        let named = tempfile::Builder::new()
            .prefix("tubely-upload-")
            .suffix(&suffix)
            .tempfile_in(&self.scratch_dir)
            .map_err(ProcessingError::ScratchUnavailable)?;

        let (file, temp_path) = named.into_parts();
        let path = temp_path
            .keep()
            .map_err(|e| ProcessingError::ScratchUnavailable(e.error))?;

        Ok((file, ScratchFile::claim(path)))
    }
}
