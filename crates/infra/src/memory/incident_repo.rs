use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use custodia_core::{AggregateRoot, ExpectedVersion, IdentityFingerprint, IncidentId, RepositoryError, RepositoryResult, TenantId};
use custodia_security::{IncidentFilter, IncidentType, SecurityIncident, SecurityIncidentRepo};

use super::poisoned;

#[derive(Debug, Default)]
pub struct InMemoryIncidentRepo {
    incidents: RwLock<HashMap<IncidentId, SecurityIncident>>,
}

impl InMemoryIncidentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.incidents.read().map(|incidents| incidents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SecurityIncidentRepo for InMemoryIncidentRepo {
    async fn insert(&self, incident: SecurityIncident) -> RepositoryResult<()> {
        let mut incidents = self.incidents.write().map_err(poisoned)?;
        if incidents.contains_key(&incident.id()) {
            return Err(RepositoryError::conflict(format!("incident {} already exists", incident.id())));
        }
        incidents.insert(incident.id(), incident);
        Ok(())
    }

    async fn update(&self, incident: SecurityIncident, expected: ExpectedVersion) -> RepositoryResult<()> {
        let mut incidents = self.incidents.write().map_err(poisoned)?;
        let stored = incidents
            .get_mut(&incident.id())
            .ok_or_else(|| RepositoryError::backend(format!("incident {} does not exist", incident.id())))?;
        if !expected.matches(stored.version()) {
            return Err(RepositoryError::conflict(format!(
                "expected {expected:?}, found {}",
                stored.version()
            )));
        }
        *stored = incident;
        Ok(())
    }

    async fn find_by_id(&self, id: IncidentId) -> RepositoryResult<Option<SecurityIncident>> {
        Ok(self.incidents.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn find_open_brute_force(
        &self,
        subject: &IdentityFingerprint,
        tenant_id: Option<TenantId>,
    ) -> RepositoryResult<Option<SecurityIncident>> {
        let incidents = self.incidents.read().map_err(poisoned)?;
        Ok(incidents
            .values()
            .filter(|i| {
                i.is_open()
                    && i.incident_type() == IncidentType::BruteForce
                    && i.subject() == Some(subject)
                    && i.tenant_id() == tenant_id
            })
            .max_by_key(|i| i.last_detected_at())
            .cloned())
    }

    async fn list(&self, filter: &IncidentFilter) -> RepositoryResult<Vec<SecurityIncident>> {
        let incidents = self.incidents.read().map_err(poisoned)?;
        let mut matching: Vec<SecurityIncident> = incidents.values().filter(|i| filter.matches(i)).cloned().collect();
        matching.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
        Ok(matching)
    }
}
