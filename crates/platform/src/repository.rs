//! Storage contracts consumed by the platform use cases.
//!
//! No storage assumptions: implementations may be in-memory (tests/dev) or a
//! transactional database. Where a contract requires atomicity it says so.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use custodia_core::{ExpectedVersion, RepositoryResult, TenantId, UserId};

use crate::{
    BootstrapOutcome, NewSuperAdmin, NewTenantUser, PlatformUser, Tenant, TenantSlug, TenantUser,
    UserStatus,
};

/// Single-row bootstrap flag. Absence of the row means "not bootstrapped".
#[async_trait]
pub trait BootstrapStateRepo: Send + Sync {
    async fn is_bootstrapped(&self) -> RepositoryResult<bool>;

    /// Set the flag. Returns `false` when it was already set; never clears it.
    async fn mark_bootstrapped(&self) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait PlatformUserRepo: Send + Sync {
    async fn exists_super_admin(&self) -> RepositoryResult<bool>;

    async fn create_super_admin(&self, admin: NewSuperAdmin) -> RepositoryResult<PlatformUser>;
}

/// Transactional unit covering the bootstrap flag and super-admin creation.
#[async_trait]
pub trait BootstrapStore: BootstrapStateRepo + PlatformUserRepo {
    /// Compare-and-set: when not bootstrapped, create `admin` and set the flag
    /// in one transaction; otherwise write nothing and report
    /// [`BootstrapOutcome::AlreadyBootstrapped`].
    ///
    /// Implementations must guarantee at most one `Created` outcome across all
    /// concurrent callers, and must never leave the admin created with the
    /// flag unset.
    async fn complete_bootstrap(&self, admin: NewSuperAdmin) -> RepositoryResult<BootstrapOutcome>;
}

#[async_trait]
pub trait TenantRepo: Send + Sync {
    async fn find_by_slug(&self, slug: &TenantSlug) -> RepositoryResult<Option<Tenant>>;

    async fn find_by_id(&self, id: TenantId) -> RepositoryResult<Option<Tenant>>;

    /// Fails with `RepositoryError::Conflict` when the slug is taken.
    async fn create(&self, tenant: Tenant) -> RepositoryResult<()>;
}

#[async_trait]
pub trait TenantUserRepo: Send + Sync {
    /// Fails with `RepositoryError::Conflict` when the email hash already
    /// exists within the tenant.
    async fn create_tenant_admin(&self, user: NewTenantUser) -> RepositoryResult<TenantUser>;

    /// Same uniqueness rule as [`create_tenant_admin`](Self::create_tenant_admin).
    async fn create_tenant_user(&self, user: NewTenantUser) -> RepositoryResult<TenantUser>;

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<TenantUser>>;

    /// Per-row optimistic update of the account status, stamped `at`.
    async fn update_status(
        &self,
        id: UserId,
        status: UserStatus,
        expected: ExpectedVersion,
        at: DateTime<Utc>,
    ) -> RepositoryResult<TenantUser>;
}
