//! The authenticator: credentials in, bearer token out.
//!
//! ```ignore
//! let authenticator = Authenticator::from_config(&config.auth)?;
//! let token = authenticator
//!     .authenticate(&Credentials::new("a@x.com", "s1"))
//!     .await?;
//! assert!(authenticator.validate_token(token.as_str()));
//! assert!(!authenticator.validate_token("garbage"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password::{DUMMY_HASH, verify_password};
use crate::store::{CredentialStore, InMemoryCredentialStore};
use crate::token::{JwtError, JwtService, TokenClaims};

/// Login credentials. Request-scoped and never persisted.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Unique lookup key (the user's email).
    #[serde(alias = "email")]
    pub identifier: String,
    /// Plaintext secret, compared against the stored hash.
    #[serde(alias = "password")]
    pub secret: String,
}

impl Credentials {
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// An issued bearer token.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Verifies credentials and issues or checks bearer tokens.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    jwt: Arc<JwtService>,
    token_lifetime: Duration,
}

impl Authenticator {
    /// Creates an authenticator from its collaborators.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        jwt: Arc<JwtService>,
        token_lifetime: Duration,
    ) -> Self {
        Self {
            store,
            jwt,
            token_lifetime,
        }
    }

    /// Builds an authenticator with an in-memory store seeded from `config`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the config does not validate.
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        config.validate()?;
        let jwt = JwtService::from_secret(config.signing_secret.as_bytes(), &config.issuer)
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        let store = InMemoryCredentialStore::from_seed(&config.users);

        tracing::info!(
            issuer = %config.issuer,
            users = store.len(),
            "Authenticator initialized"
        );

        Ok(Self::new(
            Arc::new(store),
            Arc::new(jwt),
            config.token_lifetime,
        ))
    }

    /// Shared JWT service, for services that only verify tokens.
    #[must_use]
    pub fn jwt(&self) -> Arc<JwtService> {
        Arc::clone(&self.jwt)
    }

    /// Verifies credentials and issues a token.
    ///
    /// Unknown identifiers and wrong secrets both fail with
    /// `AuthError::Unauthenticated`, after the same amount of hashing work.
    pub async fn authenticate(&self, credentials: &Credentials) -> AuthResult<Token> {
        let stored = self
            .store
            .find_by_identifier(&credentials.identifier)
            .await?;

        let secret = credentials.secret.clone();
        let hash = stored
            .as_ref()
            .map_or(DUMMY_HASH, |c| c.password_hash.as_str())
            .to_string();
        // Argon2 is CPU-bound; keep it off the async workers.
        let verified = tokio::task::spawn_blocking(move || verify_password(&secret, &hash))
            .await
            .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))?;

        let Some(stored) = stored else {
            tracing::warn!(identifier = %credentials.identifier, "Login rejected: unknown identifier");
            return Err(AuthError::unauthenticated("invalid credentials"));
        };

        let verified = verified.map_err(|e| {
            tracing::error!(identifier = %stored.identifier, error = %e, "Stored password hash is unreadable");
            AuthError::storage("stored password hash is invalid")
        })?;

        if !verified {
            tracing::warn!(identifier = %credentials.identifier, "Login rejected: secret mismatch");
            return Err(AuthError::unauthenticated("invalid credentials"));
        }

        let claims = TokenClaims::new(
            self.jwt.issuer(),
            &stored.user_id,
            &stored.identifier,
            &stored.role,
            self.token_lifetime,
        );
        let token = self
            .jwt
            .encode(&claims)
            .map_err(|e| AuthError::internal(e.to_string()))?;

        tracing::info!(identifier = %stored.identifier, role = %stored.role, "Login succeeded");
        Ok(Token(token))
    }

    /// Returns `true` only for a well-formed, unexpired token signed by us.
    #[must_use]
    pub fn validate_token(&self, token: &str) -> bool {
        self.claims(token).is_ok()
    }

    /// Decodes a token into its claims.
    pub fn claims(&self, token: &str) -> AuthResult<TokenClaims> {
        self.jwt.decode(token).map_err(|e| match e {
            JwtError::Expired => AuthError::TokenExpired,
            other => AuthError::invalid_token(other.to_string()),
        })
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("jwt", &self.jwt)
            .field("token_lifetime", &self.token_lifetime)
            .finish_non_exhaustive()
    }
}
