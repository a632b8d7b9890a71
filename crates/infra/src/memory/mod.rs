//! In-memory adapters for tests and development.
//!
//! Locks are never held across an `.await`. A poisoned lock surfaces as
//! `RepositoryError::Backend`.

mod audit_log;
mod incident_repo;
mod platform_store;
mod tenant_repo;
mod tenant_user_repo;

pub use audit_log::InMemoryAuditLog;
pub use incident_repo::InMemoryIncidentRepo;
pub use platform_store::InMemoryPlatformStore;
pub use tenant_repo::InMemoryTenantRepo;
pub use tenant_user_repo::InMemoryTenantUserRepo;

use custodia_core::RepositoryError;

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::backend("lock poisoned")
}
