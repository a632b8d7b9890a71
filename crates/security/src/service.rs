//! Manual incident handling by the data protection officer and super admins.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use custodia_audit::{
    AuditError, AuditEvent, AuditEventName, AuditMetadata, AuditPolicy, AuditTrail, SafeValue, visible_to,
};
use custodia_auth::{Actor, AuthzError, Ownership, Role, TenantAuthorizationGuard};
use custodia_core::{AggregateRoot, Clock, ExpectedVersion, IncidentId, RepositoryError, TenantId};

use crate::{DetectionConfig, IncidentError, IncidentFilter, IncidentType, SecurityIncident, SecurityIncidentRepo, Severity};

const INCIDENT_ROLES: [Role; 2] = [Role::Dpo, Role::SuperAdmin];

/// A manually declared incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportIncident {
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub tenant_id: Option<TenantId>,
}

pub struct IncidentService {
    repo: Arc<dyn SecurityIncidentRepo>,
    guard: TenantAuthorizationGuard,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
    config: DetectionConfig,
}

impl IncidentService {
    pub fn new(
        repo: Arc<dyn SecurityIncidentRepo>,
        guard: TenantAuthorizationGuard,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
        config: DetectionConfig,
    ) -> Self {
        Self {
            repo,
            guard,
            audit,
            clock,
            config,
        }
    }

    pub async fn report_incident(&self, actor: &Actor, report: ReportIncident) -> Result<SecurityIncident, IncidentError> {
        self.guard.authorize(actor, &INCIDENT_ROLES, report.tenant_id)?;

        let incident = SecurityIncident::reported(
            report.incident_type,
            report.severity,
            report.tenant_id,
            self.config.notification_threshold,
            self.clock.now(),
        );
        let event = lifecycle_event(AuditEventName::SecurityIncidentCreated, actor, &incident, incident.created_at())?;

        self.repo.insert(incident.clone()).await?;
        self.audit.record(event, AuditPolicy::Critical).await?;

        tracing::info!(
            incident_id = %incident.id(),
            incident_type = incident.incident_type().as_str(),
            severity = incident.severity().as_str(),
            "incident reported"
        );
        Ok(incident)
    }

    pub async fn notify_cnil(&self, actor: &Actor, id: IncidentId) -> Result<SecurityIncident, IncidentError> {
        self.transition(actor, id, AuditEventName::SecurityIncidentCnilNotified, SecurityIncident::notify_cnil)
            .await
    }

    pub async fn notify_users(&self, actor: &Actor, id: IncidentId) -> Result<SecurityIncident, IncidentError> {
        self.transition(actor, id, AuditEventName::SecurityIncidentUsersNotified, SecurityIncident::notify_users)
            .await
    }

    pub async fn close_incident(&self, actor: &Actor, id: IncidentId) -> Result<SecurityIncident, IncidentError> {
        self.transition(actor, id, AuditEventName::SecurityIncidentClosed, SecurityIncident::close)
            .await
    }

    pub async fn get_incident(&self, actor: &Actor, id: IncidentId) -> Result<SecurityIncident, IncidentError> {
        self.load_authorized(actor, id).await
    }

    /// Matching incidents the actor may see, newest first.
    pub async fn list_incidents(
        &self,
        actor: &Actor,
        filter: &IncidentFilter,
    ) -> Result<Vec<SecurityIncident>, IncidentError> {
        self.guard.authorize(actor, &INCIDENT_ROLES, filter.tenant_id)?;
        let incidents = self.repo.list(filter).await?;
        Ok(visible_to(actor, &incidents).into_iter().cloned().collect())
    }

    /// Apply a one-way transition. A version conflict means someone else got
    /// there first, so the incident is reloaded and the transition re-checked
    /// once; a racing repeat then reports `ALREADY_*`.
    async fn transition<F>(
        &self,
        actor: &Actor,
        id: IncidentId,
        name: AuditEventName,
        apply: F,
    ) -> Result<SecurityIncident, IncidentError>
    where
        F: Fn(&mut SecurityIncident, DateTime<Utc>) -> Result<(), IncidentError>,
    {
        let mut retried = false;
        loop {
            let mut incident = self.load_authorized(actor, id).await?;
            let expected = ExpectedVersion::Exact(incident.version());
            let now = self.clock.now();
            apply(&mut incident, now)?;
            let event = lifecycle_event(name, actor, &incident, now)?;

            match self.repo.update(incident.clone(), expected).await {
                Ok(()) => {}
                Err(RepositoryError::Conflict(_)) if !retried => {
                    tracing::debug!(incident_id = %id, event = name.as_str(), "incident changed concurrently, retrying");
                    retried = true;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            self.audit.record(event, AuditPolicy::Critical).await?;
            tracing::info!(incident_id = %id, event = name.as_str(), "incident updated");
            return Ok(incident);
        }
    }

    async fn load_authorized(&self, actor: &Actor, id: IncidentId) -> Result<SecurityIncident, IncidentError> {
        let mut loaded = None;
        let lookup = async {
            let found = self.repo.find_by_id(id).await?;
            let owner = found.as_ref().map(|incident| match incident.tenant_id() {
                Some(tenant_id) => Ownership::Tenant(tenant_id),
                None => Ownership::Platform,
            });
            loaded = found;
            Ok::<_, RepositoryError>(owner)
        };

        match self.guard.authorize_resource(actor, &INCIDENT_ROLES, lookup).await {
            Ok(_) => {}
            Err(AuthzError::ResourceMissing) => return Err(IncidentError::NotFound),
            Err(e) => return Err(e.into()),
        }
        loaded.ok_or(IncidentError::NotFound)
    }
}

impl core::fmt::Debug for IncidentService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IncidentService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn lifecycle_event(
    name: AuditEventName,
    actor: &Actor,
    incident: &SecurityIncident,
    at: DateTime<Utc>,
) -> Result<AuditEvent, AuditError> {
    let metadata = AuditMetadata::new()
        .with("incident_type", SafeValue::label(incident.incident_type().as_str())?)?
        .with("severity", SafeValue::label(incident.severity().as_str())?)?
        .with("notification_required", SafeValue::flag(incident.requires_notification()))?;

    Ok(AuditEvent::new(name, actor, at)
        .for_tenant_opt(incident.tenant_id())
        .with_target(incident.id())
        .with_metadata(metadata))
}
