//! Bearer token extraction for Axum.
//!
//! A request without a well-formed `Authorization: Bearer <token>` header is
//! rejected before any token check, with the same 401 an invalid token gets.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use carebridge_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn protected(BearerAuth(claims): BearerAuth) -> String {
//!     format!("Hello, {}!", claims.email)
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected))
//!     .with_state(AuthState::new(jwt));
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::token::{JwtError, JwtService, TokenClaims};

/// Strips the `Bearer ` prefix from a header value.
///
/// Returns `None` for a wrong scheme or an empty token. Whatever follows the
/// prefix is the token, unmodified.
#[must_use]
pub fn parse_bearer(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}

/// Extracts the bearer token from request headers.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer)
}

/// State required by the [`BearerAuth`] extractor.
///
/// Include it in the application state and expose it through `FromRef`.
#[derive(Clone, Debug)]
pub struct AuthState {
    /// JWT service for token validation.
    pub jwt: Arc<JwtService>,
}

impl AuthState {
    #[must_use]
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

/// Axum extractor that validates the bearer token and yields its claims.
///
/// Rejects with `AuthError`, which renders as a uniform 401.
pub struct BearerAuth(pub TokenClaims);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AuthError::invalid_token("missing or malformed Authorization header"))?;

        let claims = auth_state.jwt.decode(token).map_err(|e| {
            tracing::debug!(error = %e, "Failed to decode bearer token");
            match e {
                JwtError::Expired => AuthError::TokenExpired,
                other => AuthError::invalid_token(other.to_string()),
            }
        })?;

        tracing::debug!(subject = %claims.sub, "Bearer token validated");
        Ok(BearerAuth(claims))
    }
}
