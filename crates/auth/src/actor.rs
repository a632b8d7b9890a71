use serde::Serialize;
use thiserror::Error;

use custodia_core::{TenantId, UserId};

use crate::{ActorScope, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActorError {
    #[error("role {role} does not belong to scope {scope}")]
    RoleOutsideScope { role: Role, scope: ActorScope },
}

/// The authenticated party behind a request.
///
/// Fields are private: the constructors guarantee that the role belongs to
/// the scope's role set and that a tenant id is present iff the scope is
/// `TENANT`. Authorization code therefore never sees a malformed actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    id: Option<UserId>,
    scope: ActorScope,
    tenant_id: Option<TenantId>,
    role: Role,
}

impl Actor {
    /// The platform itself (scheduled jobs, detection engine, bootstrap).
    pub fn system() -> Self {
        Self {
            id: None,
            scope: ActorScope::System,
            tenant_id: None,
            role: Role::System,
        }
    }

    pub fn platform(id: UserId, role: Role) -> Result<Self, ActorError> {
        Self::ensure_scope(role, ActorScope::Platform)?;
        Ok(Self {
            id: Some(id),
            scope: ActorScope::Platform,
            tenant_id: None,
            role,
        })
    }

    pub fn tenant(id: UserId, tenant_id: TenantId, role: Role) -> Result<Self, ActorError> {
        Self::ensure_scope(role, ActorScope::Tenant)?;
        Ok(Self {
            id: Some(id),
            scope: ActorScope::Tenant,
            tenant_id: Some(tenant_id),
            role,
        })
    }

    fn ensure_scope(role: Role, scope: ActorScope) -> Result<(), ActorError> {
        if role.scope() == scope {
            Ok(())
        } else {
            Err(ActorError::RoleOutsideScope { role, scope })
        }
    }

    pub fn id(&self) -> Option<UserId> {
        self.id
    }

    pub fn scope(&self) -> ActorScope {
        self.scope
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_actor_requires_tenant_role() {
        let err = Actor::tenant(UserId::new(), TenantId::new(), Role::SuperAdmin).unwrap_err();
        assert_eq!(
            err,
            ActorError::RoleOutsideScope {
                role: Role::SuperAdmin,
                scope: ActorScope::Tenant
            }
        );
    }

    #[test]
    fn platform_actor_rejects_tenant_roles() {
        assert!(Actor::platform(UserId::new(), Role::TenantAdmin).is_err());
        assert!(Actor::platform(UserId::new(), Role::System).is_err());
    }

    #[test]
    fn tenant_id_present_iff_tenant_scope() {
        let tenant = TenantId::new();
        let member = Actor::tenant(UserId::new(), tenant, Role::TenantUser).unwrap();
        assert_eq!(member.tenant_id(), Some(tenant));

        let dpo = Actor::platform(UserId::new(), Role::Dpo).unwrap();
        assert_eq!(dpo.tenant_id(), None);
        assert_eq!(Actor::system().tenant_id(), None);
        assert_eq!(Actor::system().id(), None);
    }
}
