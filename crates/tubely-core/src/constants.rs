//! Constants shared across crates.

/// Multipart field carrying a thumbnail image.
pub const THUMBNAIL_FIELD: &str = "thumbnail";

/// Multipart field carrying a video file.
pub const VIDEO_FIELD: &str = "video";

/// The only content type accepted on the video path.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Issuer claim on access tokens.
pub const ACCESS_TOKEN_ISSUER: &str = "tubely-access";

/// Number of random bytes behind every published filename.
pub const RANDOM_NAME_BYTES: usize = 32;

/// URL path under which local image assets are served.
pub const ASSETS_ROUTE: &str = "/assets";
