//! Tubely Core Library
//!
//! Domain models, the unified error type and configuration shared by every
//! Tubely crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, ServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
