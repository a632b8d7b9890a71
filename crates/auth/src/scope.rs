//! Actor-scope hierarchy.
//!
//! `SYSTEM > PLATFORM > TENANT` in authority. Every authorization decision in
//! the workspace is phrased in terms of the three pure functions below.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use custodia_core::TenantId;

use crate::{Actor, Role};

/// Authority tier of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorScope {
    /// Internal jobs and the bootstrap procedure.
    System,
    /// Platform operators (super admins, DPOs).
    Platform,
    /// Members of exactly one tenant.
    Tenant,
}

impl ActorScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorScope::System => "SYSTEM",
            ActorScope::Platform => "PLATFORM",
            ActorScope::Tenant => "TENANT",
        }
    }

    /// Whether this scope crosses tenant boundaries.
    pub fn is_cross_tenant(self) -> bool {
        matches!(self, ActorScope::System | ActorScope::Platform)
    }
}

impl core::fmt::Display for ActorScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialOrd for ActorScope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ActorScope {
    fn cmp(&self, other: &Self) -> Ordering {
        authority_of(*self).cmp(&authority_of(*other))
    }
}

/// Integer rank of a scope; larger means more authority.
pub fn authority_of(scope: ActorScope) -> u8 {
    match scope {
        ActorScope::System => 3,
        ActorScope::Platform => 2,
        ActorScope::Tenant => 1,
    }
}

/// True if the actor may act on resources owned by `target`.
pub fn can_act_on_tenant(actor: &Actor, target: TenantId) -> bool {
    actor.scope().is_cross_tenant() || actor.tenant_id() == Some(target)
}

/// Exact-match role membership (no wildcard, no hierarchy).
pub fn has_role(actor: &Actor, allowed: &[Role]) -> bool {
    allowed.contains(&actor.role())
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_core::UserId;

    #[test]
    fn authority_is_strictly_ordered() {
        assert!(ActorScope::System > ActorScope::Platform);
        assert!(ActorScope::Platform > ActorScope::Tenant);
        assert!(authority_of(ActorScope::System) > authority_of(ActorScope::Tenant));
    }

    #[test]
    fn tenant_actor_only_acts_on_own_tenant() {
        let acme = TenantId::new();
        let globex = TenantId::new();
        let actor = Actor::tenant(UserId::new(), acme, Role::TenantAdmin).unwrap();

        assert!(can_act_on_tenant(&actor, acme));
        assert!(!can_act_on_tenant(&actor, globex));
    }

    #[test]
    fn platform_and_system_cross_tenants() {
        let any = TenantId::new();
        let dpo = Actor::platform(UserId::new(), Role::Dpo).unwrap();
        assert!(can_act_on_tenant(&dpo, any));
        assert!(can_act_on_tenant(&Actor::system(), any));
    }

    #[test]
    fn only_tenant_scope_is_tenant_bound() {
        assert!(ActorScope::System.is_cross_tenant());
        assert!(ActorScope::Platform.is_cross_tenant());
        assert!(!ActorScope::Tenant.is_cross_tenant());
    }

    #[test]
    fn has_role_is_exact_match() {
        let admin = Actor::platform(UserId::new(), Role::SuperAdmin).unwrap();
        assert!(has_role(&admin, &[Role::SuperAdmin]));
        assert!(!has_role(&admin, &[Role::Dpo]));
        assert!(!has_role(&admin, &[]));
    }
}
