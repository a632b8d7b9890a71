//! Security incidents and their one-way lifecycle.

use core::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use custodia_audit::TenantScoped;
use custodia_core::{AggregateRoot, DomainError, Entity, IdentityFingerprint, IncidentId, TenantId};

use crate::IncidentError;

/// Window after creation within which the supervisory authority must be told.
pub fn cnil_notification_delay() -> Duration {
    Duration::hours(72)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentType {
    BruteForce,
    DataBreach,
    UnauthorizedAccess,
    DataLoss,
    Other,
}

impl IncidentType {
    pub fn as_str(self) -> &'static str {
        match self {
            IncidentType::BruteForce => "BRUTE_FORCE",
            IncidentType::DataBreach => "DATA_BREACH",
            IncidentType::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            IncidentType::DataLoss => "DATA_LOSS",
            IncidentType::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// One step up, capped at `High`. `Critical` is only ever set by a person.
    pub fn escalated(self) -> Self {
        match self {
            Severity::Low => Severity::Medium,
            Severity::Medium | Severity::High => Severity::High,
            Severity::Critical => Severity::Critical,
        }
    }

    pub fn risk_level(self) -> RiskLevel {
        match self {
            Severity::Low => RiskLevel::Low,
            Severity::Medium => RiskLevel::Moderate,
            Severity::High | Severity::Critical => RiskLevel::High,
        }
    }
}

impl core::fmt::Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(DomainError::validation(format!("unknown severity: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Open,
    Closed,
}

/// Who an incident was notified to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    Cnil,
    Users,
}

impl core::fmt::Display for Notification {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Notification::Cnil => "CNIL",
            Notification::Users => "USERS",
        })
    }
}

/// Compliance record of a security incident. Never deleted.
///
/// Every timestamp set by a transition is set exactly once. Each mutation
/// bumps `version`; stores accept an update only against the previous version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIncident {
    id: IncidentId,
    incident_type: IncidentType,
    severity: Severity,
    risk_level: RiskLevel,
    tenant_id: Option<TenantId>,
    subject: Option<IdentityFingerprint>,
    status: IncidentStatus,
    detection_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_detected_at: DateTime<Utc>,
    cnil_deadline: Option<DateTime<Utc>>,
    cnil_notified_at: Option<DateTime<Utc>>,
    users_notified_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl SecurityIncident {
    fn open(
        incident_type: IncidentType,
        severity: Severity,
        tenant_id: Option<TenantId>,
        subject: Option<IdentityFingerprint>,
        detection_count: u32,
        notification_threshold: Severity,
        at: DateTime<Utc>,
    ) -> Self {
        let mut incident = Self {
            id: IncidentId::new(),
            incident_type,
            severity,
            risk_level: severity.risk_level(),
            tenant_id,
            subject,
            status: IncidentStatus::Open,
            detection_count,
            created_at: at,
            updated_at: at,
            last_detected_at: at,
            cnil_deadline: None,
            cnil_notified_at: None,
            users_notified_at: None,
            closed_at: None,
            version: 1,
        };
        incident.apply_notification_threshold(notification_threshold);
        incident
    }

    /// Brute-force incident opened by automated detection.
    pub fn detected(
        subject: IdentityFingerprint,
        tenant_id: Option<TenantId>,
        notification_threshold: Severity,
        at: DateTime<Utc>,
    ) -> Self {
        Self::open(
            IncidentType::BruteForce,
            Severity::Low,
            tenant_id,
            Some(subject),
            1,
            notification_threshold,
            at,
        )
    }

    /// Incident declared by a person, at any severity.
    pub fn reported(
        incident_type: IncidentType,
        severity: Severity,
        tenant_id: Option<TenantId>,
        notification_threshold: Severity,
        at: DateTime<Utc>,
    ) -> Self {
        Self::open(incident_type, severity, tenant_id, None, 0, notification_threshold, at)
    }

    pub fn id(&self) -> IncidentId {
        self.id
    }

    pub fn incident_type(&self) -> IncidentType {
        self.incident_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// `None` for platform-wide incidents.
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn subject(&self) -> Option<&IdentityFingerprint> {
        self.subject.as_ref()
    }

    pub fn status(&self) -> IncidentStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == IncidentStatus::Open
    }

    pub fn detection_count(&self) -> u32 {
        self.detection_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn last_detected_at(&self) -> DateTime<Utc> {
        self.last_detected_at
    }

    pub fn cnil_deadline(&self) -> Option<DateTime<Utc>> {
        self.cnil_deadline
    }

    pub fn cnil_notified_at(&self) -> Option<DateTime<Utc>> {
        self.cnil_notified_at
    }

    pub fn users_notified_at(&self) -> Option<DateTime<Utc>> {
        self.users_notified_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn requires_notification(&self) -> bool {
        self.cnil_deadline.is_some()
    }

    /// Whether `at` falls inside the correlation window of the last detection.
    pub fn correlates_with(&self, at: DateTime<Utc>, window: Duration) -> bool {
        self.is_open() && at - self.last_detected_at <= window
    }

    fn apply_notification_threshold(&mut self, threshold: Severity) {
        if self.cnil_deadline.is_none() && self.severity >= threshold {
            self.cnil_deadline = Some(self.created_at + cnil_notification_delay());
        }
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }

    /// Fold another threshold breach into this incident. Returns the previous
    /// severity when it went up.
    pub fn record_detection(&mut self, at: DateTime<Utc>, notification_threshold: Severity) -> Option<Severity> {
        let previous = self.severity;
        let next = previous.escalated();

        self.detection_count = self.detection_count.saturating_add(1);
        self.last_detected_at = self.last_detected_at.max(at);
        self.severity = next;
        self.risk_level = next.risk_level();
        self.apply_notification_threshold(notification_threshold);
        self.touch(at);

        (next != previous).then_some(previous)
    }

    pub fn notify_cnil(&mut self, at: DateTime<Utc>) -> Result<(), IncidentError> {
        if self.cnil_notified_at.is_some() {
            return Err(IncidentError::AlreadyNotified(Notification::Cnil));
        }
        self.cnil_notified_at = Some(at);
        self.touch(at);
        Ok(())
    }

    pub fn notify_users(&mut self, at: DateTime<Utc>) -> Result<(), IncidentError> {
        if self.users_notified_at.is_some() {
            return Err(IncidentError::AlreadyNotified(Notification::Users));
        }
        self.users_notified_at = Some(at);
        self.touch(at);
        Ok(())
    }

    pub fn close(&mut self, at: DateTime<Utc>) -> Result<(), IncidentError> {
        if self.status == IncidentStatus::Closed {
            return Err(IncidentError::AlreadyClosed);
        }
        self.status = IncidentStatus::Closed;
        self.closed_at = Some(at);
        self.touch(at);
        Ok(())
    }
}

impl Entity for SecurityIncident {
    type Id = IncidentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for SecurityIncident {
    type Id = IncidentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantScoped for SecurityIncident {
    fn tenant_id(&self) -> Option<TenantId> {
        SecurityIncident::tenant_id(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn brute_force(threshold: Severity) -> SecurityIncident {
        SecurityIncident::detected(IdentityFingerprint::of_login("alice@acme.test"), None, threshold, t0())
    }

    #[test]
    fn detected_incident_starts_low_with_deadline_at_default_threshold() {
        let incident = brute_force(Severity::Low);
        assert_eq!(incident.severity(), Severity::Low);
        assert_eq!(incident.risk_level(), RiskLevel::Low);
        assert_eq!(incident.incident_type(), IncidentType::BruteForce);
        assert_eq!(incident.cnil_deadline(), Some(t0() + Duration::hours(72)));
        assert_eq!(AggregateRoot::version(&incident), 1);
    }

    #[test]
    fn deadline_is_set_once_threshold_reached_and_anchored_to_creation() {
        let mut incident = brute_force(Severity::High);
        assert_eq!(incident.cnil_deadline(), None);

        assert_eq!(incident.record_detection(t0() + Duration::minutes(10), Severity::High), Some(Severity::Low));
        assert_eq!(incident.cnil_deadline(), None);

        incident.record_detection(t0() + Duration::minutes(20), Severity::High);
        assert_eq!(incident.severity(), Severity::High);
        assert_eq!(incident.cnil_deadline(), Some(t0() + Duration::hours(72)));
    }

    #[test]
    fn automated_escalation_caps_at_high() {
        let mut incident = brute_force(Severity::Low);
        for i in 1..=5 {
            incident.record_detection(t0() + Duration::minutes(i), Severity::Low);
        }
        assert_eq!(incident.severity(), Severity::High);
        assert_eq!(incident.detection_count(), 6);
        assert_eq!(incident.record_detection(t0() + Duration::minutes(9), Severity::Low), None);
    }

    #[test]
    fn notify_cnil_twice_keeps_first_timestamp() {
        let mut incident = brute_force(Severity::Low);
        let first = t0() + Duration::hours(1);
        incident.notify_cnil(first).unwrap();

        let err = incident.notify_cnil(t0() + Duration::hours(2)).unwrap_err();
        assert_eq!(err.code(), "ALREADY_NOTIFIED");
        assert_eq!(incident.cnil_notified_at(), Some(first));
    }

    #[test]
    fn close_is_one_way_and_notifications_remain_possible() {
        let mut incident = brute_force(Severity::Low);
        incident.close(t0() + Duration::hours(1)).unwrap();
        assert_eq!(incident.close(t0() + Duration::hours(2)), Err(IncidentError::AlreadyClosed));
        assert!(!incident.correlates_with(t0() + Duration::hours(1), Duration::hours(1)));

        incident.notify_users(t0() + Duration::hours(3)).unwrap();
        assert_eq!(
            incident.notify_users(t0() + Duration::hours(4)),
            Err(IncidentError::AlreadyNotified(Notification::Users))
        );
    }

    #[test]
    fn transitions_bump_version() {
        let mut incident = brute_force(Severity::Low);
        incident.notify_cnil(t0()).unwrap();
        incident.close(t0()).unwrap();
        assert_eq!(AggregateRoot::version(&incident), 3);
    }

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("medium".parse::<Severity>().unwrap(), Severity::Medium);
        assert!("SEVERE".parse::<Severity>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn severity_never_decreases_and_deadline_never_moves(
            threshold in prop_oneof![Just(Severity::Low), Just(Severity::Medium), Just(Severity::High), Just(Severity::Critical)],
            steps in proptest::collection::vec(0i64..120, 0..12),
        ) {
            let mut incident = brute_force(threshold);
            let mut deadline = incident.cnil_deadline();
            let mut at = t0();
            for step in steps {
                at += Duration::minutes(step);
                let before = incident.severity();
                incident.record_detection(at, threshold);
                prop_assert!(incident.severity() >= before);
                prop_assert!(incident.severity() <= Severity::High);
                if deadline.is_some() {
                    prop_assert_eq!(incident.cnil_deadline(), deadline);
                }
                deadline = incident.cnil_deadline();
                if let Some(d) = deadline {
                    prop_assert_eq!(d, incident.created_at() + Duration::hours(72));
                }
            }
        }
    }
}
