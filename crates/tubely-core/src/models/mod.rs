//! Data models for the application

mod asset;
mod media;
mod reference;

pub use asset::*;
pub use media::*;
pub use reference::*;
