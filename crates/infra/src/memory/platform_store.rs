use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use custodia_auth::Role;
use custodia_core::{RepositoryError, RepositoryResult, UserId};
use custodia_platform::{
    BootstrapOutcome, BootstrapStateRepo, BootstrapStore, NewSuperAdmin, PlatformUser, PlatformUserRepo,
};

use super::poisoned;

#[derive(Debug, Default)]
struct PlatformState {
    bootstrapped: bool,
    users: HashMap<UserId, PlatformUser>,
}

impl PlatformState {
    fn insert_super_admin(&mut self, admin: NewSuperAdmin) -> RepositoryResult<PlatformUser> {
        if self.users.values().any(|u| u.email_hash == admin.email_hash) {
            return Err(RepositoryError::conflict("platform user email already registered"));
        }
        let user = PlatformUser::from(admin);
        self.users.insert(user.id, user.clone());
        Ok(user)
    }
}

/// Bootstrap flag and platform users behind one mutex, so
/// [`BootstrapStore::complete_bootstrap`] is a single transaction.
#[derive(Debug, Default)]
pub struct InMemoryPlatformStore {
    state: Mutex<PlatformState>,
}

impl InMemoryPlatformStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn super_admin_count(&self) -> usize {
        self.super_admin_ids().len()
    }

    pub fn super_admin_ids(&self) -> Vec<UserId> {
        self.state
            .lock()
            .map(|state| {
                state
                    .users
                    .values()
                    .filter(|u| u.role == Role::SuperAdmin)
                    .map(|u| u.id)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl BootstrapStateRepo for InMemoryPlatformStore {
    async fn is_bootstrapped(&self) -> RepositoryResult<bool> {
        Ok(self.state.lock().map_err(poisoned)?.bootstrapped)
    }

    async fn mark_bootstrapped(&self) -> RepositoryResult<bool> {
        let mut state = self.state.lock().map_err(poisoned)?;
        if state.bootstrapped {
            return Ok(false);
        }
        state.bootstrapped = true;
        Ok(true)
    }
}

#[async_trait]
impl PlatformUserRepo for InMemoryPlatformStore {
    async fn exists_super_admin(&self) -> RepositoryResult<bool> {
        let state = self.state.lock().map_err(poisoned)?;
        Ok(state.users.values().any(|u| u.role == Role::SuperAdmin))
    }

    async fn create_super_admin(&self, admin: NewSuperAdmin) -> RepositoryResult<PlatformUser> {
        self.state.lock().map_err(poisoned)?.insert_super_admin(admin)
    }
}

#[async_trait]
impl BootstrapStore for InMemoryPlatformStore {
    async fn complete_bootstrap(&self, admin: NewSuperAdmin) -> RepositoryResult<BootstrapOutcome> {
        let mut state = self.state.lock().map_err(poisoned)?;
        if state.bootstrapped {
            return Ok(BootstrapOutcome::AlreadyBootstrapped);
        }
        let user = state.insert_super_admin(admin)?;
        state.bootstrapped = true;
        Ok(BootstrapOutcome::Created(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use custodia_core::EmailHash;

    fn admin(email: &str) -> NewSuperAdmin {
        NewSuperAdmin {
            id: UserId::new(),
            email_hash: EmailHash::of(email).unwrap(),
            display_name: "Root".into(),
            password_hash: "$argon2id$...".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn complete_bootstrap_is_compare_and_set() {
        let store = InMemoryPlatformStore::new();
        assert!(!store.is_bootstrapped().await.unwrap());

        assert!(matches!(
            store.complete_bootstrap(admin("root@example.com")).await.unwrap(),
            BootstrapOutcome::Created(_)
        ));
        assert_eq!(
            store.complete_bootstrap(admin("other@example.com")).await.unwrap(),
            BootstrapOutcome::AlreadyBootstrapped
        );
        assert!(store.is_bootstrapped().await.unwrap());
        assert!(store.exists_super_admin().await.unwrap());
        assert_eq!(store.super_admin_count(), 1);
    }

    #[tokio::test]
    async fn mark_bootstrapped_never_reverts() {
        let store = InMemoryPlatformStore::new();
        assert!(store.mark_bootstrapped().await.unwrap());
        assert!(!store.mark_bootstrapped().await.unwrap());
        assert!(store.is_bootstrapped().await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_without_flipping_the_flag() {
        let store = InMemoryPlatformStore::new();
        store.create_super_admin(admin("root@example.com")).await.unwrap();
        let err = store.complete_bootstrap(admin("root@example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(!store.is_bootstrapped().await.unwrap());
    }
}
