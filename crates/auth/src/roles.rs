use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ActorScope;

/// Role identifier used for authorization.
///
/// The set is closed and every role belongs to exactly one scope, so a role
/// check can never be satisfied by a role from another tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    System,
    SuperAdmin,
    Dpo,
    TenantAdmin,
    TenantUser,
}

impl Role {
    pub fn scope(self) -> ActorScope {
        match self {
            Role::System => ActorScope::System,
            Role::SuperAdmin | Role::Dpo => ActorScope::Platform,
            Role::TenantAdmin | Role::TenantUser => ActorScope::Tenant,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "SYSTEM",
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Dpo => "DPO",
            Role::TenantAdmin => "TENANT_ADMIN",
            Role::TenantUser => "TENANT_USER",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SYSTEM" => Ok(Role::System),
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "DPO" => Ok(Role::Dpo),
            "TENANT_ADMIN" => Ok(Role::TenantAdmin),
            "TENANT_USER" => Ok(Role::TenantUser),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_belong_to_their_scope() {
        assert_eq!(Role::SuperAdmin.scope(), ActorScope::Platform);
        assert_eq!(Role::Dpo.scope(), ActorScope::Platform);
        assert_eq!(Role::TenantAdmin.scope(), ActorScope::Tenant);
        assert_eq!(Role::TenantUser.scope(), ActorScope::Tenant);
        assert_eq!(Role::System.scope(), ActorScope::System);
    }

    #[test]
    fn parse_matches_display() {
        for role in [Role::System, Role::SuperAdmin, Role::Dpo, Role::TenantAdmin, Role::TenantUser] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }
}
