//! # carebridge-onboarding
//!
//! Coordinates one patient onboarding: persist the record, provision the
//! billing account, publish the `PATIENT_CREATED` event.
//!
//! Provisioning failures abort the attempt and reach the caller. Publish
//! failures never do.

pub mod coordinator;
pub mod error;
pub mod repository;

pub use coordinator::{Onboarded, OnboardingCoordinator, OnboardingState};
pub use error::OnboardingError;
pub use repository::{InMemoryPatientRepository, PatientRepository, RepositoryError};
