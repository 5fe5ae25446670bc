//! Patient endpoints of the patient service.
//!
//! Both routes require a bearer token. The extractor runs before the body is
//! parsed, so unauthenticated requests never reach the coordinator.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use carebridge_auth::{AuthState, BearerAuth};
use carebridge_core::{NewPatient, PatientId, PatientRecord};
use carebridge_onboarding::{Onboarded, OnboardingCoordinator};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// State shared by the patient handlers.
#[derive(Clone)]
pub struct PatientState {
    pub coordinator: Arc<OnboardingCoordinator>,
    pub auth: AuthState,
}

impl FromRef<PatientState> for AuthState {
    fn from_ref(state: &PatientState) -> Self {
        state.auth.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PatientResponse {
    pub id: PatientId,
    pub name: String,
    pub email: String,
    pub billing_account_id: String,
}

impl From<Onboarded> for PatientResponse {
    fn from(onboarded: Onboarded) -> Self {
        Self {
            id: onboarded.record.id,
            name: onboarded.record.name,
            email: onboarded.record.email,
            billing_account_id: onboarded.account.account_id,
        }
    }
}

/// `POST /patients`
pub async fn create_patient(
    State(state): State<PatientState>,
    BearerAuth(claims): BearerAuth,
    Json(body): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<PatientResponse>), ApiError> {
    tracing::debug!(requested_by = %claims.sub, "Onboarding request received");

    // The attempt outlives this handler if the client disconnects.
    let onboarded = Arc::clone(&state.coordinator)
        .onboard_detached(NewPatient::new(body.name, body.email))
        .await?;

    Ok((StatusCode::CREATED, Json(onboarded.into())))
}

/// `GET /patients`
pub async fn list_patients(
    State(state): State<PatientState>,
    BearerAuth(_claims): BearerAuth,
) -> Result<Json<Vec<PatientRecord>>, ApiError> {
    Ok(Json(state.coordinator.list().await?))
}
