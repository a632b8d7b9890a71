//! One-way hashing of personal identifiers.
//!
//! Raw emails never leave the request that carried them: stores, logs and
//! audit metadata only ever see the SHA-256 hex digest of the normalized
//! (trimmed, lower-cased) address.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

const DIGEST_HEX_LEN: usize = 64;

fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

fn is_digest_hex(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Hashed email address (P2 data).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailHash(String);

impl EmailHash {
    /// Hash a raw email address.
    ///
    /// Rejects values that are not shaped like an address so a display name or
    /// an empty field is never silently hashed in place of an email.
    pub fn of(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_lowercase();
        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(DomainError::validation("invalid email format"));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }
        Ok(Self(sha256_hex(normalized.as_bytes())))
    }

    /// Re-hydrate a digest read back from storage.
    pub fn from_hex(hex: impl Into<String>) -> DomainResult<Self> {
        let hex = hex.into();
        if !is_digest_hex(&hex) {
            return Err(DomainError::validation("email hash must be 64 lowercase hex chars"));
        }
        Ok(Self(hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for EmailHash {}

impl core::fmt::Display for EmailHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity key used by failed-login tracking and incident correlation.
///
/// Derived from whatever the login form submitted (usually an email), so
/// unknown accounts are tracked exactly like known ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityFingerprint(String);

impl IdentityFingerprint {
    pub fn of_login(identifier: &str) -> Self {
        Self(sha256_hex(identifier.trim().to_lowercase().as_bytes()))
    }

    pub fn from_hex(hex: impl Into<String>) -> DomainResult<Self> {
        let hex = hex.into();
        if !is_digest_hex(&hex) {
            return Err(DomainError::validation(
                "identity fingerprint must be 64 lowercase hex chars",
            ));
        }
        Ok(Self(hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&EmailHash> for IdentityFingerprint {
    fn from(value: &EmailHash) -> Self {
        Self(value.0.clone())
    }
}

impl ValueObject for IdentityFingerprint {}

impl core::fmt::Display for IdentityFingerprint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compare two secrets without leaking where (or whether early) they differ.
///
/// Both sides are digested first so the comparison runs over 32 bytes
/// regardless of the supplied lengths.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    let diff = a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn email_hash_normalizes_case_and_whitespace() {
        let a = EmailHash::of("  Alice@Example.com ").unwrap();
        let b = EmailHash::of("alice@example.com").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(!a.as_str().contains('@'));
    }

    #[test]
    fn email_hash_rejects_non_addresses() {
        assert!(EmailHash::of("Alice Example").is_err());
        assert!(EmailHash::of("@example.com").is_err());
        assert!(EmailHash::of("alice@").is_err());
        assert!(EmailHash::of("a@b@c").is_err());
    }

    #[test]
    fn from_hex_only_accepts_digests() {
        let h = EmailHash::of("bob@example.com").unwrap();
        assert_eq!(EmailHash::from_hex(h.as_str()).unwrap(), h);
        assert!(EmailHash::from_hex("bob@example.com").is_err());
        assert!(IdentityFingerprint::from_hex("ABC").is_err());
    }

    #[test]
    fn fingerprint_matches_email_hash_for_same_address() {
        let h = EmailHash::of("carol@example.com").unwrap();
        assert_eq!(
            IdentityFingerprint::from(&h),
            IdentityFingerprint::of_login("Carol@Example.com")
        );
    }

    #[test]
    fn secrets_match_is_exact() {
        assert!(secrets_match("s3cret-value", "s3cret-value"));
        assert!(!secrets_match("s3cret-value", "s3cret-valuE"));
        assert!(!secrets_match("", "s3cret-value"));
        assert!(!secrets_match("s3cret-value-and-more", "s3cret-value"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a digest never contains the local part it was derived from.
        #[test]
        fn email_hash_never_embeds_the_address(local in "[a-z]{6,20}", domain in "[a-z]{3,10}") {
            let email = format!("{local}@{domain}.org");
            let hash = EmailHash::of(&email).unwrap();
            prop_assert!(!hash.as_str().contains(&local));
            prop_assert!(!hash.as_str().contains('@'));
        }
    }
}
