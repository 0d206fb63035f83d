use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Coarse aspect bucket of a video. Used as the first segment of object keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl Display for AspectClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Classification of one buffered upload. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    /// Content type as declared by the client, e.g. `video/mp4; codecs=avc1`.
    pub content_type: String,
    /// File extension derived from the content subtype.
    pub extension: String,
    /// Present for video only.
    pub aspect: Option<AspectClass>,
}

impl MediaDescriptor {
    pub fn image(content_type: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            content_type: content_type.into(),
            extension: extension.into(),
            aspect: None,
        }
    }

    pub fn video(
        content_type: impl Into<String>,
        extension: impl Into<String>,
        aspect: AspectClass,
    ) -> Self {
        Self {
            kind: MediaKind::Video,
            content_type: content_type.into(),
            extension: extension.into(),
            aspect: Some(aspect),
        }
    }
}
