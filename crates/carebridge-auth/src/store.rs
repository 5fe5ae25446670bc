//! Credential storage.
//!
//! The [`CredentialStore`] trait is the seam between the authenticator and
//! wherever password hashes live. The bundled [`InMemoryCredentialStore`] is
//! seeded from configuration at startup.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::AuthResult;
use crate::config::SeedUser;

/// A stored credential. Only the hash of the secret is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    /// Stable user id, used as the token subject.
    pub user_id: String,
    /// Login identifier as it was registered.
    pub identifier: String,
    /// Argon2 PHC hash of the secret.
    pub password_hash: String,
    /// Role copied into issued tokens.
    pub role: String,
}

/// Lookup of credentials by login identifier.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Finds a credential by identifier. Lookups are case-insensitive.
    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<StoredCredential>>;
}

/// Credential store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: DashMap<String, StoredCredential>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given seed users.
    #[must_use]
    pub fn from_seed(users: &[SeedUser]) -> Self {
        let store = Self::new();
        for user in users {
            store.insert(StoredCredential {
                user_id: user
                    .user_id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                identifier: user.identifier.clone(),
                password_hash: user.password_hash.clone(),
                role: user.role.clone(),
            });
        }
        store
    }

    /// Inserts or replaces a credential.
    pub fn insert(&self, credential: StoredCredential) {
        self.credentials
            .insert(normalize(&credential.identifier), credential);
    }

    /// Number of stored credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<StoredCredential>> {
        Ok(self
            .credentials
            .get(&normalize(identifier))
            .map(|entry| entry.value().clone()))
    }
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}
