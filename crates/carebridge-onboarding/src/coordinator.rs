//! The onboarding coordinator.
//!
//! One attempt is a single forward pass:
//!
//! ```text
//! persist ──> Created ──provision──> Provisioned ──publish──> Notified
//!                 │                                      └──> NotifyFailed
//!                 └── provisioning error: attempt fails, record stays
//! ```
//!
//! `Notified` and `NotifyFailed` both report success to the caller.

use std::sync::Arc;

use carebridge_billing::{AccountProvisioner, ProvisioningRequest, ProvisioningResponse};
use carebridge_core::{NewPatient, PatientEvent, PatientRecord};
use carebridge_events::{Delivery, EventPublisher};

use crate::error::OnboardingError;
use crate::repository::PatientRepository;

/// Progress of one onboarding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingState {
    /// The record is persisted.
    Created,
    /// The billing account exists.
    Provisioned,
    /// The event was handed to the stream or its queue.
    Notified,
    /// The event was lost; the onboarding still succeeded.
    NotifyFailed,
}

impl OnboardingState {
    /// State reached from `Provisioned` once the publish outcome is known.
    pub fn after_publish(delivery: Delivery) -> Self {
        match delivery {
            Delivery::Delivered | Delivery::Queued => Self::Notified,
            Delivery::Failed => Self::NotifyFailed,
        }
    }

    /// Both notification outcomes end the attempt successfully.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Notified | Self::NotifyFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Provisioned => "provisioned",
            Self::Notified => "notified",
            Self::NotifyFailed => "notify_failed",
        }
    }
}

impl std::fmt::Display for OnboardingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully onboarded patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Onboarded {
    pub record: PatientRecord,
    pub account: ProvisioningResponse,
}

/// Orchestrates record creation, account provisioning and event publishing.
///
/// Holds no locks and no per-request state; every collaborator is shared and
/// internally synchronized, so one coordinator serves all request tasks.
pub struct OnboardingCoordinator {
    repository: Arc<dyn PatientRepository>,
    provisioner: Arc<dyn AccountProvisioner>,
    publisher: Arc<EventPublisher>,
}

impl OnboardingCoordinator {
    pub fn new(
        repository: Arc<dyn PatientRepository>,
        provisioner: Arc<dyn AccountProvisioner>,
        publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            repository,
            provisioner,
            publisher,
        }
    }

    /// Runs one onboarding attempt.
    ///
    /// # Errors
    ///
    /// - `Validation` / `Conflict` / `Persistence`: nothing was persisted.
    /// - `Provisioning`: the record exists without a billing account and no
    ///   event was published.
    pub async fn onboard(&self, patient: NewPatient) -> Result<Onboarded, OnboardingError> {
        let patient = patient.normalized()?;

        let record = self.repository.create(patient).await?;
        log_transition(&record, OnboardingState::Created);

        let request = ProvisioningRequest::from_record(&record);
        let account = match self.provisioner.create_account(&request).await {
            Ok(account) => account,
            Err(source) => {
                // No compensating delete: the record stays and is reported.
                tracing::warn!(
                    patient_id = %record.id,
                    kind = source.kind(),
                    error = %source,
                    "Patient record persisted without billing account"
                );
                return Err(OnboardingError::Provisioning {
                    patient_id: record.id,
                    source,
                });
            }
        };
        log_transition(&record, OnboardingState::Provisioned);

        let event = PatientEvent::created(&record);
        let delivery = self.publisher.publish(&event).await;
        let state = OnboardingState::after_publish(delivery);
        log_transition(&record, state);

        tracing::info!(
            patient_id = %record.id,
            account_id = %account.account_id,
            notification = %state,
            "Patient onboarded"
        );

        Ok(Onboarded { record, account })
    }

    /// Runs [`Self::onboard`] on its own task and waits for it.
    ///
    /// Dropping the returned future (a client that went away) leaves the
    /// attempt running to its end, so a persisted record is still provisioned
    /// and a provisioned record still gets its event.
    ///
    /// # Errors
    ///
    /// Everything [`Self::onboard`] returns, plus `Interrupted` if the task
    /// panicked or was cancelled.
    pub async fn onboard_detached(
        self: Arc<Self>,
        patient: NewPatient,
    ) -> Result<Onboarded, OnboardingError> {
        let attempt = tokio::spawn(async move { self.onboard(patient).await });
        match attempt.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Onboarding task did not complete");
                Err(OnboardingError::Interrupted {
                    message: e.to_string(),
                })
            }
        }
    }

    /// All stored patients.
    pub async fn list(&self) -> Result<Vec<PatientRecord>, OnboardingError> {
        Ok(self.repository.list().await?)
    }
}

fn log_transition(record: &PatientRecord, state: OnboardingState) {
    tracing::debug!(patient_id = %record.id, state = %state, "Onboarding state changed");
}

impl std::fmt::Debug for OnboardingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingCoordinator")
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}
