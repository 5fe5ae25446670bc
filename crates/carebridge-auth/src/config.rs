//! Authentication configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "carebridge-auth"
//! signing_secret = "change-me-change-me-change-me-32b"
//! token_lifetime = "10h"
//!
//! [[auth.users]]
//! identifier = "a@x.com"
//! password_hash = "$argon2id$v=19$m=19456,t=2,p=1$..."
//! role = "ADMIN"
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::password::is_valid_hash;
use crate::token::MIN_SECRET_LEN;

/// Role assigned to seed users that do not name one.
pub const DEFAULT_ROLE: &str = "USER";

/// Token signing parameters and seed credentials.
///
/// The signing secret is shared between the auth service, which issues
/// tokens, and the patient service, which only verifies them.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value of the token `iss` claim; also required on verification.
    pub issuer: String,

    /// HS256 signing secret. Must be at least 32 bytes.
    pub signing_secret: String,

    /// How long issued tokens stay valid.
    #[serde(with = "humantime_serde")]
    pub token_lifetime: Duration,

    /// Credentials loaded into the in-memory store at startup.
    pub users: Vec<SeedUser>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "carebridge-auth".to_string(),
            signing_secret: String::new(),
            token_lifetime: Duration::from_secs(10 * 60 * 60),
            users: Vec::new(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer", &self.issuer)
            .field("signing_secret", &"<redacted>")
            .field("token_lifetime", &self.token_lifetime)
            .field("users", &self.users)
            .finish()
    }
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` describing the first problem found.
    pub fn validate(&self) -> AuthResult<()> {
        if self.issuer.trim().is_empty() {
            return Err(AuthError::configuration("auth.issuer must not be empty"));
        }
        if self.signing_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::configuration(format!(
                "auth.signing_secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.token_lifetime.is_zero() {
            return Err(AuthError::configuration(
                "auth.token_lifetime must be greater than zero",
            ));
        }
        for user in &self.users {
            user.validate()?;
        }
        Ok(())
    }
}

/// A credential loaded from configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SeedUser {
    /// Login identifier (the user's email).
    pub identifier: String,

    /// Argon2 hash in PHC string format.
    pub password_hash: String,

    /// Role copied into issued tokens.
    #[serde(default = "default_role")]
    pub role: String,

    /// Stable user id for the `sub` claim. Generated when absent.
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

impl SeedUser {
    fn validate(&self) -> AuthResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(AuthError::configuration(
                "auth.users entries need a non-empty identifier",
            ));
        }
        if !is_valid_hash(&self.password_hash) {
            return Err(AuthError::configuration(format!(
                "auth.users entry '{}' has a password_hash that is not a PHC string",
                self.identifier
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::hash_password;

    fn valid() -> AuthConfig {
        AuthConfig {
            signing_secret: "0123456789abcdef0123456789abcdef".to_string(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.issuer, "carebridge-auth");
        assert_eq!(config.token_lifetime, Duration::from_secs(36_000));
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = AuthConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("signing_secret"));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_seed_user_hash_checked() {
        let mut config = valid();
        config.users.push(SeedUser {
            identifier: "a@x.com".to_string(),
            password_hash: "plaintext".to_string(),
            role: default_role(),
            user_id: None,
        });
        assert!(config.validate().is_err());

        config.users[0].password_hash = hash_password("s1").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_with_humantime() {
        let json = r#"{
            "signing_secret": "0123456789abcdef0123456789abcdef",
            "token_lifetime": "15m",
            "users": [{"identifier": "a@x.com", "password_hash": "$argon2id$x"}]
        }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.token_lifetime, Duration::from_secs(900));
        assert_eq!(config.issuer, "carebridge-auth");
        assert_eq!(config.users[0].role, "USER");
        assert!(config.users[0].user_id.is_none());
    }
}
