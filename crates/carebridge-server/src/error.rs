//! HTTP mapping of onboarding errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use carebridge_billing::ProvisioningError;
use carebridge_onboarding::OnboardingError;
use serde_json::json;

/// Error returned by the patient handlers.
#[derive(Debug)]
pub struct ApiError(pub OnboardingError);

impl From<OnboardingError> for ApiError {
    fn from(err: OnboardingError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status code and stable error code for the response body.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            OnboardingError::Validation { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
            OnboardingError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
            OnboardingError::Persistence { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_failed")
            }
            OnboardingError::Interrupted { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "onboarding_interrupted")
            }
            OnboardingError::Provisioning { source, .. } => match source {
                ProvisioningError::Unreachable { .. } => {
                    (StatusCode::BAD_GATEWAY, "billing_unreachable")
                }
                ProvisioningError::RemoteFailure { .. } => {
                    (StatusCode::BAD_GATEWAY, "billing_failed")
                }
                ProvisioningError::Timeout { .. } => {
                    (StatusCode::GATEWAY_TIMEOUT, "billing_timeout")
                }
                ProvisioningError::Configuration { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "billing_misconfigured")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "Onboarding request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Onboarding request rejected");
        }

        (
            status,
            Json(json!({
                "error": code,
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}
