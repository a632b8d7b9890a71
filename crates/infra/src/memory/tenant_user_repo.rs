use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use custodia_auth::Role;
use custodia_core::{ExpectedVersion, RepositoryError, RepositoryResult, UserId};
use custodia_platform::{NewTenantUser, TenantUser, TenantUserRepo, UserStatus};

use super::poisoned;

#[derive(Debug, Default)]
pub struct InMemoryTenantUserRepo {
    users: RwLock<HashMap<UserId, TenantUser>>,
}

impl InMemoryTenantUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, user: NewTenantUser, role: Role) -> RepositoryResult<TenantUser> {
        let mut users = self.users.write().map_err(poisoned)?;
        let duplicate = users
            .values()
            .any(|u| u.tenant_id == user.tenant_id && u.email_hash == user.email_hash);
        if duplicate {
            return Err(RepositoryError::conflict("email already registered in tenant"));
        }
        let user = user.into_user(role);
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl TenantUserRepo for InMemoryTenantUserRepo {
    async fn create_tenant_admin(&self, user: NewTenantUser) -> RepositoryResult<TenantUser> {
        self.insert(user, Role::TenantAdmin)
    }

    async fn create_tenant_user(&self, user: NewTenantUser) -> RepositoryResult<TenantUser> {
        self.insert(user, Role::TenantUser)
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<TenantUser>> {
        Ok(self.users.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: UserId,
        status: UserStatus,
        expected: ExpectedVersion,
        at: DateTime<Utc>,
    ) -> RepositoryResult<TenantUser> {
        let mut users = self.users.write().map_err(poisoned)?;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::backend(format!("tenant user {id} does not exist")))?;
        if !expected.matches(user.version) {
            return Err(RepositoryError::conflict(format!(
                "expected {expected:?}, found {}",
                user.version
            )));
        }
        user.status = status;
        user.updated_at = at;
        user.version += 1;
        Ok(user.clone())
    }
}
