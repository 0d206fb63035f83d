//! Bearer-token authentication.

pub mod jwt;
pub mod models;

pub use jwt::{AccessClaims, JwtValidator};
pub use models::AuthenticatedUser;
