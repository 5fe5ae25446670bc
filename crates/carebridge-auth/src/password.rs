//! Argon2 password hashing.
//!
//! Secrets are never stored in plaintext. Hashes use Argon2id with default
//! parameters and a random salt, encoded in PHC string format so they can be
//! placed directly into configuration or a credential table.
//!
//! ```
//! use carebridge_auth::password::{hash_password, verify_password};
//!
//! let hash = hash_password("s1").unwrap();
//! assert!(hash.starts_with("$argon2id$"));
//! assert!(verify_password("s1", &hash).unwrap());
//! assert!(!verify_password("s2", &hash).unwrap());
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// A PHC string with the parameters [`hash_password`] produces. It matches no
/// secret; verifying against it costs the same as a real check.
pub const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$Y2FyZWJyaWRnZS1kdW1teQ$AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8";

/// Hash a password for storage using Argon2id.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// `Ok(false)` means the password does not match. `Err` is returned only
/// when the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    let result = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    Ok(result.is_ok())
}

/// Checks that a stored hash is a parseable PHC string.
pub fn is_valid_hash(hash: &str) -> bool {
    PasswordHash::new(hash).is_ok()
}
