//! Random names for published media.
//!
//! Every name is built from 32 bytes of OS-seeded randomness, so names never
//! carry client input and two uploads never share a name.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tubely_core::constants::RANDOM_NAME_BYTES;
use tubely_core::models::AspectClass;

fn random_bytes() -> [u8; RANDOM_NAME_BYTES] {
    rand::random()
}

/// URL-safe, unpadded base64 token (43 characters).
pub fn random_url_token() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes())
}

/// Lowercase hex token (64 characters).
pub fn random_hex_token() -> String {
    hex::encode(random_bytes())
}

/// Filename for a local asset: `{token}.{ext}`.
pub fn asset_filename(extension: &str) -> String {
    format!("{}.{}", random_url_token(), extension)
}

/// Object key for a video: `{aspect}/{token}.{ext}`.
pub fn video_object_key(aspect: AspectClass, extension: &str) -> String {
    format!("{}/{}.{}", aspect, random_hex_token(), extension)
}
