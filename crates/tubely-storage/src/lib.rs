//! Tubely Storage Library
//!
//! Durable homes for published media:
//!
//! - [`Storage`]: the object store videos are published to. Implemented by
//!   [`S3Storage`] and, for development, [`LocalStorage`].
//! - [`AssetDirectory`]: the local directory thumbnails are written to and
//!   served from.
//!
//! Object keys have the shape `{aspect}/{token}.{ext}` and asset filenames the
//! shape `{token}.{ext}`. Both are built in the `keys` module from random
//! tokens, never from client input.

pub mod assets;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use assets::AssetDirectory;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ByteReader, Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;
