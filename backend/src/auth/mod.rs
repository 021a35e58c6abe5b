use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::axum_http::error_responses::error_response;

#[derive(Debug, Serialize, Deserialize)]
pub struct SupabaseClaims {
    pub sub: String,
    pub email: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),
    #[error("authentication is not configured")]
    NotConfigured,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::AuthenticationRequired(_) => {
                error_response(StatusCode::UNAUTHORIZED, self.to_string())
            }
            AuthError::NotConfigured => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

/// HS256 verifier for Supabase access tokens, built once at startup and
/// shared with handlers through a request extension.
pub struct SupabaseJwt {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SupabaseJwt {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.set_audience(&["authenticated", "service_role"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<SupabaseClaims, AuthError> {
        let token_data = decode::<SupabaseClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::AuthenticationRequired(format!("JWT validation failed: {e}")))?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = parts
            .extensions
            .get::<Arc<SupabaseJwt>>()
            .cloned()
            .ok_or_else(|| {
                error!("auth: SupabaseJwt extension missing from router");
                AuthError::NotConfigured
            })?;

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| {
                    warn!(reason = %rejection, "auth: missing or malformed bearer token");
                    AuthError::AuthenticationRequired(
                        "missing or malformed Authorization header".to_string(),
                    )
                })?;

        let claims = verifier.validate(bearer.token())?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            AuthError::AuthenticationRequired("invalid user ID in token".to_string())
        })?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
        })
    }
}
