use thiserror::Error;

use custodia_audit::AuditError;
use custodia_auth::AuthzError;
use custodia_core::{DomainError, RepositoryError};

use crate::Notification;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IncidentError {
    #[error("incident was already notified to {0}")]
    AlreadyNotified(Notification),

    #[error("incident is already closed")]
    AlreadyClosed,

    #[error("incident not found")]
    NotFound,

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl IncidentError {
    pub fn code(&self) -> &'static str {
        match self {
            IncidentError::AlreadyNotified(_) => "ALREADY_NOTIFIED",
            IncidentError::AlreadyClosed => "ALREADY_CLOSED",
            IncidentError::NotFound => "INCIDENT_NOT_FOUND",
            IncidentError::Authz(e) => e.code(),
            IncidentError::Validation(_) => "VALIDATION_FAILED",
            IncidentError::Repository(_) => "REPOSITORY_ERROR",
            IncidentError::Audit(e) => e.code(),
        }
    }
}

/// Why a failure could not be tracked. Callers on the login path swallow these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("failed-login tracker is full ({0} keys)")]
    AtCapacity(usize),
}
