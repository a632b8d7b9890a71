use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use custodia_core::{RepositoryError, RepositoryResult, TenantId};
use custodia_platform::{Tenant, TenantRepo, TenantSlug};

use super::poisoned;

#[derive(Debug, Default)]
pub struct InMemoryTenantRepo {
    tenants: RwLock<HashMap<TenantId, Tenant>>,
}

impl InMemoryTenantRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantRepo for InMemoryTenantRepo {
    async fn find_by_slug(&self, slug: &TenantSlug) -> RepositoryResult<Option<Tenant>> {
        let tenants = self.tenants.read().map_err(poisoned)?;
        Ok(tenants.values().find(|t| &t.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: TenantId) -> RepositoryResult<Option<Tenant>> {
        Ok(self.tenants.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn create(&self, tenant: Tenant) -> RepositoryResult<()> {
        let mut tenants = self.tenants.write().map_err(poisoned)?;
        if tenants.values().any(|t| t.slug == tenant.slug) {
            return Err(RepositoryError::conflict(format!("tenant slug '{}' is taken", tenant.slug)));
        }
        if tenants.contains_key(&tenant.id) {
            return Err(RepositoryError::conflict("tenant id already exists"));
        }
        tenants.insert(tenant.id, tenant);
        Ok(())
    }
}
