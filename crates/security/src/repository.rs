use async_trait::async_trait;

use custodia_core::{ExpectedVersion, IdentityFingerprint, IncidentId, RepositoryResult, TenantId};

use crate::{IncidentStatus, IncidentType, SecurityIncident};

/// Query over incidents. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentFilter {
    pub status: Option<IncidentStatus>,
    pub incident_type: Option<IncidentType>,
    pub tenant_id: Option<TenantId>,
}

impl IncidentFilter {
    pub fn matches(&self, incident: &SecurityIncident) -> bool {
        self.status.is_none_or(|s| s == incident.status())
            && self.incident_type.is_none_or(|t| t == incident.incident_type())
            && self.tenant_id.is_none_or(|t| Some(t) == incident.tenant_id())
    }
}

/// Incident storage. Records are never deleted; updates are per-row
/// optimistic against [`ExpectedVersion`].
#[async_trait]
pub trait SecurityIncidentRepo: Send + Sync {
    async fn insert(&self, incident: SecurityIncident) -> RepositoryResult<()>;

    /// Replace the stored incident if its version matches `expected`, otherwise
    /// fail with `RepositoryError::Conflict`.
    async fn update(&self, incident: SecurityIncident, expected: ExpectedVersion) -> RepositoryResult<()>;

    async fn find_by_id(&self, id: IncidentId) -> RepositoryResult<Option<SecurityIncident>>;

    /// Most recently detected open brute-force incident for `subject` in `tenant_id`.
    async fn find_open_brute_force(
        &self,
        subject: &IdentityFingerprint,
        tenant_id: Option<TenantId>,
    ) -> RepositoryResult<Option<SecurityIncident>>;

    /// Matching incidents, newest first.
    async fn list(&self, filter: &IncidentFilter) -> RepositoryResult<Vec<SecurityIncident>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use chrono::Utc;

    #[test]
    fn empty_filter_matches_everything() {
        let incident = SecurityIncident::reported(IncidentType::DataLoss, Severity::High, None, Severity::Low, Utc::now());
        assert!(IncidentFilter::default().matches(&incident));
    }

    #[test]
    fn filter_fields_combine() {
        let acme = TenantId::new();
        let incident =
            SecurityIncident::reported(IncidentType::DataBreach, Severity::Medium, Some(acme), Severity::Low, Utc::now());

        let filter = IncidentFilter {
            status: Some(IncidentStatus::Open),
            incident_type: Some(IncidentType::DataBreach),
            tenant_id: Some(acme),
        };
        assert!(filter.matches(&incident));

        let other_tenant = IncidentFilter {
            tenant_id: Some(TenantId::new()),
            ..filter.clone()
        };
        assert!(!other_tenant.matches(&incident));

        let closed = IncidentFilter {
            status: Some(IncidentStatus::Closed),
            ..filter
        };
        assert!(!closed.matches(&incident));
    }
}
