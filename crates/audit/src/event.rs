use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed vocabulary of audit event names.
///
/// Names are stable identifiers (e.g. `"tenant.created"`); adding a variant is
/// the only way a new kind of audited operation comes into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum AuditEventName {
    PlatformBootstrapCompleted,
    TenantCreated,
    TenantViewed,
    TenantUserCreated,
    TenantUserViewed,
    TenantUserSuspended,
    SecurityIncidentCreated,
    SecurityIncidentEscalated,
    SecurityIncidentCnilNotified,
    SecurityIncidentUsersNotified,
    SecurityIncidentClosed,
}

impl AuditEventName {
    pub const ALL: [AuditEventName; 11] = [
        AuditEventName::PlatformBootstrapCompleted,
        AuditEventName::TenantCreated,
        AuditEventName::TenantViewed,
        AuditEventName::TenantUserCreated,
        AuditEventName::TenantUserViewed,
        AuditEventName::TenantUserSuspended,
        AuditEventName::SecurityIncidentCreated,
        AuditEventName::SecurityIncidentEscalated,
        AuditEventName::SecurityIncidentCnilNotified,
        AuditEventName::SecurityIncidentUsersNotified,
        AuditEventName::SecurityIncidentClosed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AuditEventName::PlatformBootstrapCompleted => "platform.bootstrap.completed",
            AuditEventName::TenantCreated => "tenant.created",
            AuditEventName::TenantViewed => "tenant.viewed",
            AuditEventName::TenantUserCreated => "tenant_user.created",
            AuditEventName::TenantUserViewed => "tenant_user.viewed",
            AuditEventName::TenantUserSuspended => "tenant_user.suspended",
            AuditEventName::SecurityIncidentCreated => "security.incident.created",
            AuditEventName::SecurityIncidentEscalated => "security.incident.escalated",
            AuditEventName::SecurityIncidentCnilNotified => "security.incident.cnil_notified",
            AuditEventName::SecurityIncidentUsersNotified => "security.incident.users_notified",
            AuditEventName::SecurityIncidentClosed => "security.incident.closed",
        }
    }

    /// Reads of personal data, as opposed to state changes.
    pub fn is_sensitive_read(self) -> bool {
        matches!(self, AuditEventName::TenantViewed | AuditEventName::TenantUserViewed)
    }
}

impl core::fmt::Display for AuditEventName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AuditEventName> for &'static str {
    fn from(value: AuditEventName) -> Self {
        value.as_str()
    }
}

impl FromStr for AuditEventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditEventName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown audit event name '{s}'"))
    }
}

impl TryFrom<String> for AuditEventName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
