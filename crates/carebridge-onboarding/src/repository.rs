//! Patient record persistence.

use async_trait::async_trait;
use carebridge_core::{NewPatient, PatientId, PatientRecord};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Errors from the patient store.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A patient with this email already exists.
    #[error("Patient with email {email} already exists")]
    Conflict { email: String },

    #[error("Patient store unavailable: {message}")]
    Unavailable { message: String },
}

/// Stores patient records. Ids are assigned on creation.
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Persists a new record. Emails are unique, compared case-insensitively.
    async fn create(&self, patient: NewPatient) -> Result<PatientRecord, RepositoryError>;

    async fn get(&self, id: PatientId) -> Result<Option<PatientRecord>, RepositoryError>;

    /// All records, ordered by name.
    async fn list(&self) -> Result<Vec<PatientRecord>, RepositoryError>;
}

/// Concurrent in-memory patient store.
#[derive(Debug, Default)]
pub struct InMemoryPatientRepository {
    records: DashMap<PatientId, PatientRecord>,
    emails: DashMap<String, PatientId>,
}

impl InMemoryPatientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn create(&self, patient: NewPatient) -> Result<PatientRecord, RepositoryError> {
        // Reserving the email first makes the uniqueness check atomic.
        let id = match self.emails.entry(patient.email.to_lowercase()) {
            Entry::Occupied(_) => {
                return Err(RepositoryError::Conflict {
                    email: patient.email,
                });
            }
            Entry::Vacant(slot) => {
                let id = PatientId::generate();
                slot.insert(id);
                id
            }
        };

        let record = PatientRecord::new(id, patient);
        self.records.insert(id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: PatientId) -> Result<Option<PatientRecord>, RepositoryError> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<PatientRecord>, RepositoryError> {
        let mut records: Vec<PatientRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}
