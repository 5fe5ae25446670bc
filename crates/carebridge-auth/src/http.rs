//! HTTP surface of the auth service.
//!
//! - `POST /login {identifier, secret}` returns `200 {token}` or `401`
//! - `GET /validate` with `Authorization: Bearer <token>` returns `200` or `401`

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;

use crate::authenticator::{Authenticator, Credentials, Token};
use crate::error::AuthError;
use crate::middleware::bearer_token;

/// Body of a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: Token,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_unauthorized() {
            // Callers never learn which check failed.
            let mut headers = HeaderMap::new();
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            return (
                StatusCode::UNAUTHORIZED,
                headers,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response();
        }

        tracing::error!(error = %self, "Auth request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal_error" })),
        )
            .into_response()
    }
}

/// `POST /login`
pub async fn login_handler(
    State(authenticator): State<Arc<Authenticator>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, AuthError> {
    let token = authenticator.authenticate(&credentials).await?;
    Ok(Json(LoginResponse { token }))
}

/// `GET /validate`
pub async fn validate_handler(
    State(authenticator): State<Arc<Authenticator>>,
    headers: HeaderMap,
) -> Result<StatusCode, AuthError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AuthError::invalid_token("missing or malformed Authorization header"))?;

    if authenticator.validate_token(token) {
        Ok(StatusCode::OK)
    } else {
        Err(AuthError::invalid_token("token rejected"))
    }
}

/// Router with the login and validation endpoints.
pub fn auth_routes(authenticator: Arc<Authenticator>) -> Router {
    Router::new()
        .route("/login", post(login_handler))
        .route("/validate", get(validate_handler))
        .with_state(authenticator)
}
