//! Tenant authorization guard.
//!
//! The single decision point consumed by every sensitive operation. Denials
//! caused by a foreign tenant and by a missing resource are deliberately the
//! same value for tenant-scoped actors, and every policy denial collapses to
//! one outward signal ([`PublicDenial::NotFound`]) so tenant existence cannot
//! be probed by guessing ids.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use custodia_core::TenantId;

use crate::{Actor, ActorScope, Role, can_act_on_tenant, has_role};

/// Upper bound for resolving a resource's owner when the caller gives none.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    ForbiddenRole,
    ForbiddenTenant,
}

impl DenyReason {
    pub fn code(self) -> &'static str {
        match self {
            DenyReason::ForbiddenRole => "FORBIDDEN_ROLE",
            DenyReason::ForbiddenTenant => "FORBIDDEN_TENANT",
        }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzDecision {
    Allow,
    Deny(DenyReason),
}

impl AuthzDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, AuthzDecision::Allow)
    }

    pub fn into_result(self) -> Result<(), AuthzError> {
        match self {
            AuthzDecision::Allow => Ok(()),
            AuthzDecision::Deny(DenyReason::ForbiddenRole) => Err(AuthzError::ForbiddenRole),
            AuthzDecision::Deny(DenyReason::ForbiddenTenant) => Err(AuthzError::ForbiddenTenant),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role not permitted")]
    ForbiddenRole,

    #[error("forbidden: resource is outside the actor's tenant")]
    ForbiddenTenant,

    /// Only produced for cross-tenant actors; tenant actors get `ForbiddenTenant`.
    #[error("resource not found")]
    ResourceMissing,

    /// The owner lookup failed or timed out (fail closed).
    #[error("authorization lookup failed: {0}")]
    LookupFailed(String),
}

impl AuthzError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthzError::ForbiddenRole => "FORBIDDEN_ROLE",
            AuthzError::ForbiddenTenant => "FORBIDDEN_TENANT",
            AuthzError::ResourceMissing => "NOT_FOUND",
            AuthzError::LookupFailed(_) => "AUTHZ_LOOKUP_FAILED",
        }
    }

    /// What a caller outside the trust boundary may observe.
    pub fn outward(&self) -> PublicDenial {
        match self {
            AuthzError::ForbiddenRole | AuthzError::ForbiddenTenant | AuthzError::ResourceMissing => {
                PublicDenial::NotFound
            }
            AuthzError::LookupFailed(_) => PublicDenial::Unavailable,
        }
    }
}

/// Transport-neutral rejection shape handed to route handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicDenial {
    NotFound,
    Unavailable,
}

impl PublicDenial {
    pub fn code(self) -> &'static str {
        match self {
            PublicDenial::NotFound => "not_found",
            PublicDenial::Unavailable => "unavailable",
        }
    }

    /// HTTP-equivalent status for callers that speak HTTP.
    pub fn status(self) -> u16 {
        match self {
            PublicDenial::NotFound => 404,
            PublicDenial::Unavailable => 503,
        }
    }
}

/// Who owns a resource, as reported by an owner lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Tenant(TenantId),
    /// Platform-wide record (e.g. an incident with no tenant).
    Platform,
}

/// Authorize an actor for an operation, optionally against a target tenant.
///
/// - No IO
/// - No panics
/// - Role check first, tenant isolation second
pub fn authorize(actor: &Actor, required_roles: &[Role], target_tenant: Option<TenantId>) -> AuthzDecision {
    if !has_role(actor, required_roles) {
        tracing::debug!(scope = %actor.scope(), role = %actor.role(), reason = "FORBIDDEN_ROLE", "authorization denied");
        return AuthzDecision::Deny(DenyReason::ForbiddenRole);
    }

    if let Some(target) = target_tenant {
        if !can_act_on_tenant(actor, target) {
            tracing::debug!(scope = %actor.scope(), role = %actor.role(), reason = "FORBIDDEN_TENANT", "authorization denied");
            return AuthzDecision::Deny(DenyReason::ForbiddenTenant);
        }
    }

    AuthzDecision::Allow
}

/// Guard wrapping [`authorize`] with owner resolution for id-addressed reads.
#[derive(Debug, Clone, Copy)]
pub struct TenantAuthorizationGuard {
    lookup_timeout: Duration,
}

impl Default for TenantAuthorizationGuard {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_TIMEOUT)
    }
}

impl TenantAuthorizationGuard {
    pub fn new(lookup_timeout: Duration) -> Self {
        Self { lookup_timeout }
    }

    pub fn authorize(
        &self,
        actor: &Actor,
        required_roles: &[Role],
        target_tenant: Option<TenantId>,
    ) -> Result<(), AuthzError> {
        authorize(actor, required_roles, target_tenant).into_result()
    }

    pub async fn authorize_resource<F, E>(
        &self,
        actor: &Actor,
        required_roles: &[Role],
        lookup: F,
    ) -> Result<Ownership, AuthzError>
    where
        F: Future<Output = Result<Option<Ownership>, E>>,
        E: core::fmt::Display,
    {
        self.authorize_resource_within(actor, required_roles, lookup, self.lookup_timeout)
            .await
    }

    /// Resolve the owner of an id-addressed resource and authorize against it.
    ///
    /// For tenant-scoped actors "does not exist", "belongs to another tenant"
    /// and "is platform-owned" all return [`AuthzError::ForbiddenTenant`].
    pub async fn authorize_resource_within<F, E>(
        &self,
        actor: &Actor,
        required_roles: &[Role],
        lookup: F,
        timeout: Duration,
    ) -> Result<Ownership, AuthzError>
    where
        F: Future<Output = Result<Option<Ownership>, E>>,
        E: core::fmt::Display,
    {
        authorize(actor, required_roles, None).into_result()?;

        let owner = match tokio::time::timeout(timeout, lookup).await {
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "authorization owner lookup timed out");
                return Err(AuthzError::LookupFailed(format!(
                    "timed out after {}ms",
                    timeout.as_millis()
                )));
            }
            Ok(Err(e)) => return Err(AuthzError::LookupFailed(e.to_string())),
            Ok(Ok(owner)) => owner,
        };

        match (owner, actor.scope()) {
            (Some(Ownership::Tenant(tenant_id)), _) => {
                authorize(actor, required_roles, Some(tenant_id)).into_result()?;
                Ok(Ownership::Tenant(tenant_id))
            }
            (Some(Ownership::Platform), ActorScope::Tenant) | (None, ActorScope::Tenant) => {
                tracing::debug!(scope = %actor.scope(), role = %actor.role(), reason = "FORBIDDEN_TENANT", "authorization denied");
                Err(AuthzError::ForbiddenTenant)
            }
            (Some(Ownership::Platform), _) => Ok(Ownership::Platform),
            (None, _) => Err(AuthzError::ResourceMissing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_core::UserId;
    use proptest::prelude::*;

    fn tenant_admin(tenant: TenantId) -> Actor {
        Actor::tenant(UserId::new(), tenant, Role::TenantAdmin).unwrap()
    }

    #[test]
    fn missing_role_is_denied_before_tenant_check() {
        let acme = TenantId::new();
        let user = Actor::tenant(UserId::new(), acme, Role::TenantUser).unwrap();
        assert_eq!(
            authorize(&user, &[Role::TenantAdmin], Some(TenantId::new())),
            AuthzDecision::Deny(DenyReason::ForbiddenRole)
        );
    }

    #[test]
    fn same_tenant_is_allowed() {
        let acme = TenantId::new();
        assert!(authorize(&tenant_admin(acme), &[Role::TenantAdmin], Some(acme)).is_allowed());
    }

    #[test]
    fn no_target_means_role_check_only() {
        let acme = TenantId::new();
        assert!(authorize(&tenant_admin(acme), &[Role::TenantAdmin], None).is_allowed());
    }

    #[test]
    fn every_policy_denial_looks_the_same_outside() {
        for err in [AuthzError::ForbiddenRole, AuthzError::ForbiddenTenant, AuthzError::ResourceMissing] {
            assert_eq!(err.outward(), PublicDenial::NotFound);
            assert_eq!(err.outward().status(), 404);
        }
        assert_eq!(
            AuthzError::LookupFailed("db down".into()).outward(),
            PublicDenial::Unavailable
        );
    }

    #[tokio::test]
    async fn foreign_and_missing_resources_are_indistinguishable_for_tenant_actors() {
        let guard = TenantAuthorizationGuard::default();
        let acme = TenantId::new();
        let globex = TenantId::new();
        let actor = tenant_admin(acme);

        let foreign = guard
            .authorize_resource(&actor, &[Role::TenantAdmin], async {
                Ok::<_, String>(Some(Ownership::Tenant(globex)))
            })
            .await
            .unwrap_err();
        let missing = guard
            .authorize_resource(&actor, &[Role::TenantAdmin], async { Ok::<_, String>(None) })
            .await
            .unwrap_err();
        let platform = guard
            .authorize_resource(&actor, &[Role::TenantAdmin], async {
                Ok::<_, String>(Some(Ownership::Platform))
            })
            .await
            .unwrap_err();

        assert_eq!(foreign, missing);
        assert_eq!(foreign, platform);
        assert_eq!(foreign.code(), "FORBIDDEN_TENANT");
    }

    #[tokio::test]
    async fn platform_actor_sees_missing_as_not_found() {
        let guard = TenantAuthorizationGuard::default();
        let admin = Actor::platform(UserId::new(), Role::SuperAdmin).unwrap();
        let err = guard
            .authorize_resource(&admin, &[Role::SuperAdmin], async { Ok::<_, String>(None) })
            .await
            .unwrap_err();
        assert_eq!(err, AuthzError::ResourceMissing);
        assert_eq!(err.outward(), PublicDenial::NotFound);
    }

    #[tokio::test]
    async fn lookup_timeout_fails_closed() {
        let guard = TenantAuthorizationGuard::default();
        let acme = TenantId::new();
        let err = guard
            .authorize_resource_within(
                &tenant_admin(acme),
                &[Role::TenantAdmin],
                async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, String>(Some(Ownership::Tenant(acme)))
                },
                Duration::from_millis(10),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AUTHZ_LOOKUP_FAILED");
    }

    #[tokio::test]
    async fn role_denial_skips_the_lookup() {
        let guard = TenantAuthorizationGuard::default();
        let acme = TenantId::new();
        let user = Actor::tenant(UserId::new(), acme, Role::TenantUser).unwrap();
        let err = guard
            .authorize_resource(&user, &[Role::TenantAdmin], async {
                Err::<Option<Ownership>, _>("lookup must not run")
            })
            .await
            .unwrap_err();
        assert_eq!(err, AuthzError::ForbiddenRole);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a tenant-scoped actor is always denied on any other tenant,
        /// whatever tenant role it holds and whichever roles are required.
        #[test]
        fn tenant_actor_never_reaches_foreign_tenant(
            own in any::<u128>(),
            other in any::<u128>(),
            admin in any::<bool>(),
            require_both in any::<bool>(),
        ) {
            prop_assume!(own != other);
            let own = TenantId::from_uuid(uuid::Uuid::from_u128(own));
            let other = TenantId::from_uuid(uuid::Uuid::from_u128(other));
            let role = if admin { Role::TenantAdmin } else { Role::TenantUser };
            let actor = Actor::tenant(UserId::new(), own, role).unwrap();
            let required: Vec<Role> = if require_both {
                vec![Role::TenantAdmin, Role::TenantUser]
            } else {
                vec![role]
            };

            let decision = authorize(&actor, &required, Some(other));
            prop_assert_eq!(decision, AuthzDecision::Deny(DenyReason::ForbiddenTenant));
            prop_assert_eq!(
                decision.into_result().unwrap_err().outward(),
                PublicDenial::NotFound
            );
        }
    }
}
