//! Patient identifiers, creation requests and stored records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

/// Identifier assigned to a patient record at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(Uuid);

impl PatientId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for PatientId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PatientId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::invalid_id(s))
    }
}

/// Request to create a patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub email: String,
}

impl NewPatient {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Trims the fields and checks them for basic well-formedness.
    pub fn normalized(self) -> Result<Self, CoreError> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_string();

        if name.is_empty() {
            return Err(CoreError::validation("name", "must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CoreError::validation(
                "name",
                format!("must be at most {MAX_NAME_LEN} characters"),
            ));
        }
        if email.len() > MAX_EMAIL_LEN {
            return Err(CoreError::validation(
                "email",
                format!("must be at most {MAX_EMAIL_LEN} bytes"),
            ));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(CoreError::validation("email", "is not a valid address")),
        }

        Ok(Self { name, email })
    }
}

/// A persisted patient record. Read-only once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: PatientId,
    pub name: String,
    pub email: String,
}

impl PatientRecord {
    #[must_use]
    pub fn new(id: PatientId, patient: NewPatient) -> Self {
        Self {
            id,
            name: patient.name,
            email: patient.email,
        }
    }
}
