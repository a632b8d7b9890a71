//! Storage-facing error model shared by every repository contract.

use thiserror::Error;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Infrastructure failure reported by a repository or writer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Optimistic concurrency or uniqueness conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store could not be reached in time.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure (driver error, poisoned lock, ...).
    #[error("backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
