//! Database repositories for data access layer

pub mod asset;

pub use asset::{AssetRepository, PgAssetRepository};
