/// Prefix for all JSON API routes.
pub const API_PREFIX: &str = "/api";

/// Route under which objects of the local storage backend are served.
pub const OBJECTS_ROUTE: &str = "/objects";

/// Extra room above a media size limit for multipart framing and other form fields.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
