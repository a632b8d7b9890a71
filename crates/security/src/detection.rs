//! Turns failed-login threshold breaches into brute-force incidents.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use custodia_audit::{AuditError, AuditEvent, AuditEventName, AuditMetadata, AuditPolicy, AuditTrail, SafeValue};
use custodia_auth::Actor;
use custodia_core::{AggregateRoot, ExpectedVersion, IdentityFingerprint, TenantId};

use crate::{IncidentError, SecurityIncident, SecurityIncidentRepo, Severity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionConfig {
    /// Breaches this close to the previous detection escalate the same incident.
    pub correlation_window: Duration,
    /// Lowest severity that starts the notification deadline.
    pub notification_threshold: Severity,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            correlation_window: Duration::hours(1),
            notification_threshold: Severity::Low,
        }
    }
}

/// What the tracker saw when the threshold was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionContext {
    pub occurred_at: DateTime<Utc>,
    pub failure_count: u32,
}

pub struct IncidentDetectionEngine {
    repo: Arc<dyn SecurityIncidentRepo>,
    audit: AuditTrail,
    config: DetectionConfig,
    // One detection at a time per subject: the find-then-insert below is not
    // atomic in the store. Entries nobody holds are pruned on the next lookup.
    subjects: StdMutex<HashMap<SubjectKey, Arc<Mutex<()>>>>,
}

type SubjectKey = (IdentityFingerprint, Option<TenantId>);

impl IncidentDetectionEngine {
    pub fn new(repo: Arc<dyn SecurityIncidentRepo>, audit: AuditTrail, config: DetectionConfig) -> Self {
        Self {
            repo,
            audit,
            config,
            subjects: StdMutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Open a brute-force incident for `identity`, or escalate the open one
    /// whose last detection falls within the correlation window.
    pub async fn on_threshold_exceeded(
        &self,
        identity: &IdentityFingerprint,
        tenant_id: Option<TenantId>,
        context: DetectionContext,
    ) -> Result<SecurityIncident, IncidentError> {
        let subject_lock = self.subject_lock(identity, tenant_id);
        let _serial = subject_lock.lock().await;
        let at = context.occurred_at;
        let threshold = self.config.notification_threshold;

        let existing = self
            .repo
            .find_open_brute_force(identity, tenant_id)
            .await?
            .filter(|incident| incident.correlates_with(at, self.config.correlation_window));

        match existing {
            Some(mut incident) => {
                let expected = ExpectedVersion::Exact(incident.version());
                let previous = incident.record_detection(at, threshold);
                let event = incident_event(AuditEventName::SecurityIncidentEscalated, &incident, context, previous)?;

                self.repo.update(incident.clone(), expected).await?;
                self.audit.record(event, AuditPolicy::Critical).await?;

                match previous {
                    Some(previous) => tracing::warn!(
                        incident_id = %incident.id(),
                        subject = %identity,
                        from = previous.as_str(),
                        to = incident.severity().as_str(),
                        detections = incident.detection_count(),
                        "brute-force incident escalated"
                    ),
                    None => tracing::info!(
                        incident_id = %incident.id(),
                        subject = %identity,
                        detections = incident.detection_count(),
                        "repeat breach folded into brute-force incident"
                    ),
                }
                Ok(incident)
            }
            None => {
                let incident = SecurityIncident::detected(identity.clone(), tenant_id, threshold, at);
                let event = incident_event(AuditEventName::SecurityIncidentCreated, &incident, context, None)?;

                self.repo.insert(incident.clone()).await?;
                self.audit.record(event, AuditPolicy::Critical).await?;

                tracing::info!(
                    incident_id = %incident.id(),
                    subject = %identity,
                    severity = incident.severity().as_str(),
                    notification_required = incident.requires_notification(),
                    "brute-force incident opened"
                );
                Ok(incident)
            }
        }
    }
}

impl IncidentDetectionEngine {
    fn subject_lock(&self, identity: &IdentityFingerprint, tenant_id: Option<TenantId>) -> Arc<Mutex<()>> {
        let mut subjects = self.subjects.lock().unwrap_or_else(|p| p.into_inner());
        subjects.retain(|_, lock| Arc::strong_count(lock) > 1);
        subjects
            .entry((identity.clone(), tenant_id))
            .or_default()
            .clone()
    }

    /// Subjects with a detection in flight or waiting.
    pub fn subjects_in_flight(&self) -> usize {
        let subjects = self.subjects.lock().unwrap_or_else(|p| p.into_inner());
        subjects.values().filter(|lock| Arc::strong_count(lock) > 1).count()
    }
}

impl core::fmt::Debug for IncidentDetectionEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IncidentDetectionEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn incident_event(
    name: AuditEventName,
    incident: &SecurityIncident,
    context: DetectionContext,
    previous: Option<Severity>,
) -> Result<AuditEvent, AuditError> {
    let mut metadata = AuditMetadata::new()
        .with("incident_type", SafeValue::label(incident.incident_type().as_str())?)?
        .with("severity", SafeValue::label(incident.severity().as_str())?)?
        .with("risk_level", SafeValue::label(incident.risk_level().as_str())?)?
        .with("detection_count", SafeValue::count(u64::from(incident.detection_count())))?
        .with("failure_count", SafeValue::count(u64::from(context.failure_count)))?
        .with("notification_required", SafeValue::flag(incident.requires_notification()))?;
    if let Some(subject) = incident.subject() {
        metadata.insert("subject", SafeValue::hashed(subject))?;
    }
    if let Some(previous) = previous {
        metadata.insert("previous_severity", SafeValue::label(previous.as_str())?)?;
    }

    Ok(AuditEvent::new(name, &Actor::system(), context.occurred_at)
        .for_tenant_opt(incident.tenant_id())
        .with_target(incident.id())
        .with_metadata(metadata))
}
