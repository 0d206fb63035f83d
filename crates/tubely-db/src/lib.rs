//! Tubely Database Layer
//!
//! Repositories for video records. The upload pipeline only depends on the
//! [`AssetRepository`] trait; [`PgAssetRepository`] is the PostgreSQL
//! implementation wired in by the API binary.

pub mod db;

pub use db::{AssetRepository, PgAssetRepository};
