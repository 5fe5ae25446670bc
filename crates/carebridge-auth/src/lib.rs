//! # carebridge-auth
//!
//! Authentication for the CareBridge services.
//!
//! This crate provides:
//! - Credential verification against Argon2 password hashes
//! - HS256 bearer token issuance and validation
//! - An in-memory credential store seeded from configuration
//! - Axum handlers for `POST /login` and `GET /validate`
//! - A `BearerAuth` extractor that gates other services' routes
//!
//! ## Modules
//!
//! - [`authenticator`] - the `Authenticator` that turns credentials into tokens
//! - [`config`] - signing parameters, token lifetime and seed users
//! - [`error`] - `AuthError` and its HTTP mapping
//! - [`http`] - Axum handlers for the login and validation endpoints
//! - [`middleware`] - bearer header parsing and the `BearerAuth` extractor
//! - [`password`] - Argon2 hashing helpers
//! - [`store`] - credential storage trait and in-memory implementation
//! - [`token`] - JWT encoding and decoding

pub mod authenticator;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod password;
pub mod store;
pub mod token;

pub use authenticator::{Authenticator, Credentials, Token};
pub use config::{AuthConfig, SeedUser};
pub use error::AuthError;
pub use http::{LoginResponse, auth_routes, login_handler, validate_handler};
pub use middleware::{AuthState, BearerAuth, bearer_token, parse_bearer};
pub use store::{CredentialStore, InMemoryCredentialStore, StoredCredential};
pub use token::{JwtError, JwtService, TokenClaims};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;
