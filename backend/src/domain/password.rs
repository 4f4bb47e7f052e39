//! One-way password credential.
//!
//! Secrets are hashed with Argon2id into PHC strings. The plaintext only
//! lives for the duration of the hashing call and is zeroised afterwards.

use std::fmt;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Hashing failures.
///
/// Never raised for weak input; strength policy belongs to request
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("password hashing failed: {message}")]
    Hashing { message: String },
}

/// Salted adaptive hash of an account secret.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordCredential {
    hash: String,
}

impl PasswordCredential {
    /// Hash a plaintext secret into a fresh credential.
    pub fn from_plaintext(plaintext: impl Into<String>) -> Result<Self, CredentialError> {
        let plaintext = Zeroizing::new(plaintext.into());
        let hash = hash_secret(plaintext.as_bytes())?;
        Ok(Self { hash })
    }

    /// Rebuild a credential from a stored PHC string.
    ///
    /// The string is not parsed here; a malformed hash simply never
    /// verifies.
    #[must_use]
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Replace the stored hash with one computed from `plaintext`.
    pub fn set(&mut self, plaintext: impl Into<String>) -> Result<(), CredentialError> {
        let plaintext = Zeroizing::new(plaintext.into());
        self.hash = hash_secret(plaintext.as_bytes())?;
        Ok(())
    }

    /// Check a candidate secret.
    ///
    /// A malformed stored hash and a wrong candidate are indistinguishable to
    /// the caller.
    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }

    /// Stored PHC string, for persistence adapters.
    #[must_use]
    pub fn as_phc(&self) -> &str {
        &self.hash
    }
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredential")
            .field("hash", &"<redacted>")
            .finish()
    }
}

fn hash_secret(secret: &[u8]) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret, &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CredentialError::Hashing {
            message: err.to_string(),
        })
}
