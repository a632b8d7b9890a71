//! `custodia-security` — failed-login tracking and security incidents.
//!
//! The [`FailedLoginTracker`] is a process-local heuristic; the
//! [`SecurityIncident`] records produced by the [`IncidentDetectionEngine`]
//! are the authoritative compliance trail.

pub mod detection;
pub mod error;
pub mod failed_login;
pub mod incident;
pub mod monitor;
pub mod repository;
pub mod service;

pub use detection::{DetectionConfig, DetectionContext, IncidentDetectionEngine};
pub use error::{IncidentError, TrackerError};
pub use failed_login::{FailedLoginConfig, FailedLoginTracker, FailureCount};
pub use incident::{
    IncidentStatus, IncidentType, Notification, RiskLevel, SecurityIncident, Severity, cnil_notification_delay,
};
pub use monitor::{LoginFailureMonitor, MonitorOutcome};
pub use repository::{IncidentFilter, SecurityIncidentRepo};
pub use service::{IncidentService, ReportIncident};
