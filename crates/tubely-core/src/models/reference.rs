use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::AppError;

/// Value recorded on an `AssetRecord` once its bytes are stored.
///
/// Local assets are stored as a directly fetchable URL. Objects are stored as
/// `bucket,key` and only turned into a signed URL when read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishedReference {
    LocalAsset { url: String },
    Object { bucket: String, key: String },
}

impl PublishedReference {
    pub fn local(url: impl Into<String>) -> Self {
        PublishedReference::LocalAsset { url: url.into() }
    }

    pub fn object(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        PublishedReference::Object {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl Display for PublishedReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PublishedReference::LocalAsset { url } => f.write_str(url),
            PublishedReference::Object { bucket, key } => write!(f, "{},{}", bucket, key),
        }
    }
}

impl FromStr for PublishedReference {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if !value.contains(',') {
            return Ok(PublishedReference::local(value));
        }

        let parts: Vec<&str> = value.split(',').collect();
        match parts.as_slice() {
            [bucket, key] if !bucket.is_empty() && !key.is_empty() => {
                Ok(PublishedReference::object(*bucket, *key))
            }
            _ => Err(AppError::Internal(format!(
                "Malformed object reference: {}",
                value
            ))),
        }
    }
}
