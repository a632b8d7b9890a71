//! Tenant-scoped accounts: TENANT_ADMIN and TENANT_USER.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use custodia_audit::{AuditError, AuditEvent, AuditEventName, AuditMetadata, AuditPolicy, AuditTrail, SafeValue};
use custodia_auth::{Actor, AuthzError, Ownership, Role, TenantAuthorizationGuard};
use custodia_core::{
    AggregateRoot, Clock, DomainError, EmailHash, Entity, ExpectedVersion, RepositoryError, TenantId,
    UserId,
};

use crate::password::validate_new_account;
use crate::{PasswordHasher, PlatformError, TenantRepo, TenantUserRepo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Suspended,
}

/// Caller-supplied details of a new tenant account.
#[derive(Clone)]
pub struct TenantUserInput {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

impl core::fmt::Debug for TenantUserInput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TenantUserInput").finish_non_exhaustive()
    }
}

/// Validated account ready to be persisted. The role is chosen by the
/// repository method it is passed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTenantUser {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub email_hash: EmailHash,
    pub display_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl NewTenantUser {
    /// Materialize the stored row for `role`, starting active at version 1.
    pub fn into_user(self, role: Role) -> TenantUser {
        TenantUser {
            id: self.id,
            tenant_id: self.tenant_id,
            email_hash: self.email_hash,
            display_name: self.display_name,
            role,
            status: UserStatus::Active,
            password_hash: self.password_hash,
            created_at: self.created_at,
            updated_at: self.created_at,
            version: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantUser {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub email_hash: EmailHash,
    pub display_name: String,
    pub role: Role,
    pub status: UserStatus,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl TenantUser {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

impl Entity for TenantUser {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for TenantUser {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

pub struct TenantUserService {
    users: Arc<dyn TenantUserRepo>,
    tenants: Arc<dyn TenantRepo>,
    hasher: Arc<dyn PasswordHasher>,
    guard: TenantAuthorizationGuard,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
}

impl TenantUserService {
    pub fn new(
        users: Arc<dyn TenantUserRepo>,
        tenants: Arc<dyn TenantRepo>,
        hasher: Arc<dyn PasswordHasher>,
        guard: TenantAuthorizationGuard,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            tenants,
            hasher,
            guard,
            audit,
            clock,
        }
    }

    /// SUPER_ADMIN only.
    pub async fn create_tenant_admin(
        &self,
        actor: &Actor,
        tenant_id: TenantId,
        input: TenantUserInput,
    ) -> Result<TenantUser, PlatformError> {
        self.guard.authorize(actor, &[Role::SuperAdmin], Some(tenant_id))?;
        self.create(actor, tenant_id, input, Role::TenantAdmin).await
    }

    /// SUPER_ADMIN, or TENANT_ADMIN of the same tenant.
    pub async fn create_tenant_user(
        &self,
        actor: &Actor,
        tenant_id: TenantId,
        input: TenantUserInput,
    ) -> Result<TenantUser, PlatformError> {
        self.guard
            .authorize(actor, &[Role::SuperAdmin, Role::TenantAdmin], Some(tenant_id))?;
        self.create(actor, tenant_id, input, Role::TenantUser).await
    }

    async fn create(
        &self,
        actor: &Actor,
        tenant_id: TenantId,
        input: TenantUserInput,
        role: Role,
    ) -> Result<TenantUser, PlatformError> {
        if self.tenants.find_by_id(tenant_id).await?.is_none() {
            return Err(PlatformError::NotFound);
        }

        let (email_hash, display_name) =
            validate_new_account(&input.email, &input.display_name, &input.password)?;
        let password_hash = self.hasher.hash(&input.password)?;

        let new_user = NewTenantUser {
            id: UserId::new(),
            tenant_id,
            email_hash,
            display_name,
            password_hash,
            created_at: self.clock.now(),
        };

        let metadata = AuditMetadata::new()
            .with("role", role)
            .and_then(|m| m.with("email_hash", SafeValue::hashed(&new_user.email_hash)))
            .map_err(AuditError::from)?;
        let event = AuditEvent::new(AuditEventName::TenantUserCreated, actor, new_user.created_at)
            .for_tenant(tenant_id)
            .with_target(new_user.id)
            .with_metadata(metadata);

        let created = match role {
            Role::TenantAdmin => self.users.create_tenant_admin(new_user).await,
            _ => self.users.create_tenant_user(new_user).await,
        };
        let user = match created {
            Ok(user) => user,
            Err(RepositoryError::Conflict(_)) => {
                return Err(DomainError::conflict("email already registered in this tenant").into());
            }
            Err(e) => return Err(e.into()),
        };

        self.audit.record(event, AuditPolicy::Critical).await?;

        tracing::info!(user_id = %user.id, tenant_id = %tenant_id, role = %role, "tenant user created");
        Ok(user)
    }

    /// Platform staff, or a TENANT_ADMIN of the user's tenant.
    pub async fn get_tenant_user(&self, actor: &Actor, user_id: UserId) -> Result<TenantUser, PlatformError> {
        let user = self
            .load_authorized(actor, &[Role::SuperAdmin, Role::Dpo, Role::TenantAdmin], user_id)
            .await?;

        let event = AuditEvent::new(AuditEventName::TenantUserViewed, actor, self.clock.now())
            .for_tenant(user.tenant_id)
            .with_target(user.id);
        self.audit.record(event, AuditPolicy::for_event(AuditEventName::TenantUserViewed)).await?;

        Ok(user)
    }

    /// SUPER_ADMIN, or a TENANT_ADMIN of the user's tenant. Actors cannot
    /// suspend themselves.
    pub async fn suspend_tenant_user(&self, actor: &Actor, user_id: UserId) -> Result<TenantUser, PlatformError> {
        let user = self
            .load_authorized(actor, &[Role::SuperAdmin, Role::TenantAdmin], user_id)
            .await?;

        if actor.id() == Some(user.id) {
            return Err(DomainError::invariant("an account cannot suspend itself").into());
        }
        if !user.is_active() {
            return Err(DomainError::validation("user is already suspended").into());
        }

        let metadata = AuditMetadata::new()
            .with("role", user.role)
            .map_err(AuditError::from)?;
        let now = self.clock.now();
        let event = AuditEvent::new(AuditEventName::TenantUserSuspended, actor, now)
            .for_tenant(user.tenant_id)
            .with_target(user.id)
            .with_metadata(metadata);

        let updated = self
            .users
            .update_status(user.id, UserStatus::Suspended, ExpectedVersion::Exact(user.version), now)
            .await?;

        self.audit.record(event, AuditPolicy::Critical).await?;

        tracing::info!(user_id = %updated.id, tenant_id = %updated.tenant_id, "tenant user suspended");
        Ok(updated)
    }

    async fn load_authorized(
        &self,
        actor: &Actor,
        roles: &[Role],
        user_id: UserId,
    ) -> Result<TenantUser, PlatformError> {
        let mut loaded = None;
        let lookup = async {
            let found = self.users.find_by_id(user_id).await?;
            let owner = found.as_ref().map(|u| Ownership::Tenant(u.tenant_id));
            loaded = found;
            Ok::<_, RepositoryError>(owner)
        };

        match self.guard.authorize_resource(actor, roles, lookup).await {
            Ok(_) => {}
            Err(AuthzError::ResourceMissing) => return Err(PlatformError::NotFound),
            Err(e) => return Err(e.into()),
        }
        loaded.ok_or(PlatformError::NotFound)
    }
}

impl core::fmt::Debug for TenantUserService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TenantUserService")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}
