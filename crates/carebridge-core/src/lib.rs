//! # carebridge-core
//!
//! Shared types for the CareBridge onboarding services.
//!
//! - [`patient`] - patient identifiers, creation requests and stored records
//! - [`event`] - the `PatientEvent` domain event and its protobuf wire form
//! - [`error`] - validation errors shared by the service crates

pub mod error;
pub mod event;
pub mod patient;

pub use error::{CoreError, Result};
pub use event::{EVENT_TYPE_PATIENT_CREATED, PATIENT_TOPIC, PatientEvent};
pub use patient::{NewPatient, PatientId, PatientRecord};
