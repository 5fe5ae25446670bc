//! The patient domain event.
//!
//! `PatientEvent` is published to the stream once a patient record has been
//! persisted and its billing account provisioned. The wire form is protobuf
//! (`patient.events.PatientEvent`) so consumers in any language can decode it.

use prost::Message;

use crate::error::CoreError;
use crate::patient::PatientRecord;

/// Event type tag for newly onboarded patients.
pub const EVENT_TYPE_PATIENT_CREATED: &str = "PATIENT_CREATED";

/// Stream topic for patient events.
pub const PATIENT_TOPIC: &str = "patient";

/// Domain event describing an onboarded patient.
///
/// Fields are copied from the [`PatientRecord`] when the event is built and
/// never change afterwards.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct PatientEvent {
    #[prost(string, tag = "1")]
    pub patient_id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(string, tag = "4")]
    pub event_type: String,
}

impl PatientEvent {
    /// Builds a `PATIENT_CREATED` event from a persisted record.
    #[must_use]
    pub fn created(record: &PatientRecord) -> Self {
        Self {
            patient_id: record.id.to_string(),
            name: record.name.clone(),
            email: record.email.clone(),
            event_type: EVENT_TYPE_PATIENT_CREATED.to_string(),
        }
    }

    /// Serializes the event to its protobuf wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, prost::EncodeError> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decodes an event from its protobuf wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(Self::decode(bytes)?)
    }
}
