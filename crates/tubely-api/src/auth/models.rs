use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::sync::Arc;
use tubely_core::AppError;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

/// The principal behind a request's bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Couldn't find JWT".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed authorization header".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AppError::Unauthorized(
            "Malformed authorization header".to_string(),
        )),
    }
}

// Reads headers only, so it can run ahead of the Multipart extractor.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);
        let token = bearer_token(&parts.headers)?;
        let user_id = state.jwt.validate(token)?;

        Ok(AuthenticatedUser { user_id })
    }
}
