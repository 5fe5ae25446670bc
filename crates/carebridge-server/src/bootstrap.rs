//! Startup wiring.
//!
//! Every collaborator is built here and handed to its dependents through
//! constructors. Process-wide resources (the billing channel, the stream
//! client and its publisher) are created once and released in
//! [`PatientService::shutdown`].

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use carebridge_auth::{AuthState, Authenticator, JwtService};
use carebridge_billing::BillingClient;
use carebridge_events::{EventPublisher, build_stream};
use carebridge_onboarding::{InMemoryPatientRepository, OnboardingCoordinator};

use crate::config::AppConfig;
use crate::routes::patients::PatientState;
use crate::server::{build_auth_app, build_patient_app};

/// Builds the auth service router.
pub fn auth_service(config: &AppConfig) -> anyhow::Result<Router> {
    let authenticator =
        Authenticator::from_config(&config.auth).context("authenticator setup failed")?;
    Ok(build_auth_app(Arc::new(authenticator)))
}

/// The patient service and the resources it owns.
pub struct PatientService {
    state: PatientState,
    publisher: Arc<EventPublisher>,
}

impl PatientService {
    pub async fn bootstrap(config: &AppConfig) -> anyhow::Result<Self> {
        let jwt = JwtService::from_secret(config.auth.signing_secret.as_bytes(), &config.auth.issuer)
            .context("token verification setup failed")?;

        let billing = BillingClient::connect(&config.billing)
            .await
            .context("billing client setup failed")?;

        let stream = build_stream(&config.events).context("event stream setup failed")?;
        let publisher = Arc::new(EventPublisher::from_config(stream, &config.events));

        let coordinator = OnboardingCoordinator::new(
            Arc::new(InMemoryPatientRepository::new()),
            Arc::new(billing),
            Arc::clone(&publisher),
        );

        Ok(Self {
            state: PatientState {
                coordinator: Arc::new(coordinator),
                auth: AuthState::new(Arc::new(jwt)),
            },
            publisher,
        })
    }

    pub fn router(&self) -> Router {
        build_patient_app(self.state.clone())
    }

    /// Drains queued events and flushes the stream client.
    pub async fn shutdown(&self) {
        self.publisher.shutdown().await;
        tracing::info!("Patient service resources released");
    }
}
