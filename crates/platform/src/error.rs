use thiserror::Error;

use custodia_audit::AuditError;
use custodia_auth::AuthzError;
use custodia_core::{DomainError, RepositoryError};

use crate::PasswordHashError;

/// Failures of the one-time bootstrap.
///
/// These are surfaced verbatim to the (trusted) operator running it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("invalid bootstrap secret")]
    InvalidSecret,

    #[error("platform is already bootstrapped")]
    AlreadyBootstrapped,

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Hashing(#[from] PasswordHashError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl BootstrapError {
    pub fn code(&self) -> &'static str {
        match self {
            BootstrapError::InvalidSecret => "INVALID_BOOTSTRAP_SECRET",
            BootstrapError::AlreadyBootstrapped => "ALREADY_BOOTSTRAPPED",
            BootstrapError::Validation(_) => "VALIDATION_FAILED",
            BootstrapError::Hashing(_) | BootstrapError::Repository(_) => "REPOSITORY_ERROR",
            BootstrapError::Audit(e) => e.code(),
        }
    }
}

/// Failures of tenant and tenant-user administration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("tenant slug is already taken")]
    SlugTaken,

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Hashing(#[from] PasswordHashError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl PlatformError {
    pub fn code(&self) -> &'static str {
        match self {
            PlatformError::Authz(e) => e.code(),
            PlatformError::Validation(_) => "VALIDATION_FAILED",
            PlatformError::SlugTaken => "TENANT_SLUG_TAKEN",
            PlatformError::NotFound => "NOT_FOUND",
            PlatformError::Hashing(_) | PlatformError::Repository(_) => "REPOSITORY_ERROR",
            PlatformError::Audit(e) => e.code(),
        }
    }
}
