//! Classification-safe audit metadata.
//!
//! Only P1 scalars (labels, counts, flags) and P2 digests may be attached to an
//! audit event. Free text, emails and anything else a constructor cannot
//! prove safe is rejected with a [`MetadataError`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use custodia_auth::{ActorScope, Role};
use custodia_core::{EmailHash, IdentityFingerprint, ValueObject};

/// Longest label accepted; longer tokens are treated as free text.
pub const MAX_LABEL_LEN: usize = 64;

const DIGEST_HEX_LEN: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("label must be 1..=64 chars of [A-Za-z0-9_.:-]")]
    InvalidLabel,

    #[error("hashed id must be 64 lowercase hex chars")]
    InvalidHashedId,
}

/// Enum-like token (`SUPER_ADMIN`, `brute_force`, `HIGH`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AuditLabel(String);

impl AuditLabel {
    pub fn new(raw: impl Into<String>) -> Result<Self, MetadataError> {
        let raw = raw.into();
        let well_formed = !raw.is_empty()
            && raw.len() <= MAX_LABEL_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-'));
        if well_formed {
            Ok(Self(raw))
        } else {
            Err(MetadataError::InvalidLabel)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AuditLabel {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AuditLabel> for String {
    fn from(value: AuditLabel) -> Self {
        value.0
    }
}

/// SHA-256 hex digest of an identifier (P2).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HashedId(String);

impl HashedId {
    pub fn from_hex(raw: impl Into<String>) -> Result<Self, MetadataError> {
        let raw = raw.into();
        if raw.len() == DIGEST_HEX_LEN && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            Ok(Self(raw))
        } else {
            Err(MetadataError::InvalidHashedId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HashedId {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(value)
    }
}

impl From<HashedId> for String {
    fn from(value: HashedId) -> Self {
        value.0
    }
}

impl From<&EmailHash> for HashedId {
    fn from(value: &EmailHash) -> Self {
        Self(value.as_str().to_string())
    }
}

impl From<&IdentityFingerprint> for HashedId {
    fn from(value: &IdentityFingerprint) -> Self {
        Self(value.as_str().to_string())
    }
}

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SafeValue {
    Label(AuditLabel),
    Count(u64),
    Flag(bool),
    HashedId(HashedId),
}

impl SafeValue {
    pub fn label(raw: impl Into<String>) -> Result<Self, MetadataError> {
        Ok(Self::Label(AuditLabel::new(raw)?))
    }

    pub fn count(n: u64) -> Self {
        Self::Count(n)
    }

    pub fn flag(b: bool) -> Self {
        Self::Flag(b)
    }

    pub fn hashed(id: impl Into<HashedId>) -> Self {
        Self::HashedId(id.into())
    }
}

impl ValueObject for SafeValue {}

impl From<Role> for SafeValue {
    fn from(value: Role) -> Self {
        Self::Label(AuditLabel(value.as_str().to_string()))
    }
}

impl From<ActorScope> for SafeValue {
    fn from(value: ActorScope) -> Self {
        Self::Label(AuditLabel(value.as_str().to_string()))
    }
}

/// Ordered key → value map attached to an audit event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditMetadata(BTreeMap<AuditLabel, SafeValue>);

impl AuditMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<SafeValue>) -> Result<(), MetadataError> {
        self.0.insert(AuditLabel::new(key)?, value.into());
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: &str, value: impl Into<SafeValue>) -> Result<Self, MetadataError> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&SafeValue> {
        self.0.iter().find(|(k, _)| k.as_str() == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SafeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
