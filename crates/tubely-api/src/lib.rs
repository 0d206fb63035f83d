//! Tubely API Library
//!
//! HTTP surface for uploading and reading video media: routes, handlers,
//! authentication and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
mod telemetry;

pub mod auth;
pub mod error;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
