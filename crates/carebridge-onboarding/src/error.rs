//! Onboarding error types.

use carebridge_billing::ProvisioningError;
use carebridge_core::{CoreError, PatientId};

use crate::repository::RepositoryError;

/// Why an onboarding attempt failed.
///
/// Publish failures are absent on purpose: they never fail an onboarding.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// The request did not pass validation. Nothing was persisted.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// A patient with the same email exists. Nothing was persisted.
    #[error("Patient with email {email} already exists")]
    Conflict { email: String },

    /// The record could not be persisted.
    #[error("Persistence failed: {message}")]
    Persistence { message: String },

    /// The record was persisted but has no billing account.
    #[error("Billing provisioning failed for patient {patient_id}: {source}")]
    Provisioning {
        patient_id: PatientId,
        #[source]
        source: ProvisioningError,
    },

    /// The task running the attempt ended without an outcome.
    #[error("Onboarding attempt interrupted: {message}")]
    Interrupted { message: String },
}

impl OnboardingError {
    /// The provisioning failure, if that is what ended the attempt.
    pub fn provisioning_error(&self) -> Option<&ProvisioningError> {
        match self {
            Self::Provisioning { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns `true` if the caller sent something unacceptable.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Conflict { .. })
    }
}

impl From<CoreError> for OnboardingError {
    fn from(err: CoreError) -> Self {
        Self::Validation {
            message: err.to_string(),
        }
    }
}

impl From<RepositoryError> for OnboardingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { email } => Self::Conflict { email },
            RepositoryError::Unavailable { message } => Self::Persistence { message },
        }
    }
}
