//! Invitation tokens and their stored hashes.
//!
//! The raw token is handed to the mail dispatcher and never persisted. Stores
//! only ever see a [`TokenHash`].

use std::fmt;

use sha2::{Digest, Sha256};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Raw invitation secret as delivered to the invitee.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct InvitationToken(String);

impl InvitationToken {
    /// Wrap a caller-supplied token.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Generate a random UUID v4 token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Expose the raw secret, e.g. to embed it in the invitation message.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// One-way hash used for persistence and lookup.
    #[must_use]
    pub fn hash(&self) -> TokenHash {
        TokenHash::of(self.0.as_bytes())
    }
}

impl fmt::Debug for InvitationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvitationToken(<redacted>)")
    }
}

/// Lowercase hex SHA-256 digest of an [`InvitationToken`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    fn of(raw: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(raw)))
    }

    /// Rebuild a hash loaded from storage.
    #[must_use]
    pub fn from_stored(hex_digest: impl Into<String>) -> Self {
        Self(hex_digest.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn hash_is_stable_hex_sha256() {
        let hash = InvitationToken::new("T1").hash();
        assert_eq!(hash, InvitationToken::new("T1").hash());
        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[rstest]
    fn hash_hides_raw_value() {
        let token = InvitationToken::new("plain-token");
        assert!(!token.hash().as_str().contains("plain-token"));
        assert_ne!(token.hash(), InvitationToken::new("other-token").hash());
    }

    #[rstest]
    fn known_digest_matches() {
        // printf 'abc' | sha256sum
        assert_eq!(
            InvitationToken::new("abc").hash().as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[rstest]
    fn generated_tokens_are_unique_uuids() {
        let first = InvitationToken::generate();
        let second = InvitationToken::generate();
        assert_ne!(first, second);
        assert!(Uuid::parse_str(first.expose()).is_ok());
    }

    #[rstest]
    fn debug_is_redacted() {
        let rendered = format!("{:?}", InvitationToken::new("secret-value"));
        assert!(!rendered.contains("secret-value"));
    }
}
