//! HS256 access tokens.
//!
//! Tokens carry the user id in `sub` and must be issued by
//! `tubely-access`. Anything else is rejected as unauthorized.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tubely_core::constants::ACCESS_TOKEN_ISSUER;
use tubely_core::AppError;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ACCESS_TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate `token` and return the user id it was issued to.
    pub fn validate(&self, token: &str) -> Result<Uuid, AppError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                tracing::debug!(error = %e, "JWT validation failed");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::Unauthorized("Token has expired".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                        AppError::Unauthorized("Invalid token issuer".to_string())
                    }
                    _ => AppError::Unauthorized("Couldn't validate JWT".to_string()),
                }
            },
        )?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))
    }

    /// Issue an access token for `user_id` valid for `expires_in`.
    pub fn issue(&self, user_id: Uuid, expires_in: Duration) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            iss: ACCESS_TOKEN_ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now + expires_in.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}
