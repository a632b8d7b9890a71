//! Glue between the login flow and incident detection.
//!
//! Nothing here can fail a login: every error is logged and swallowed.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use custodia_core::{IdentityFingerprint, IncidentId, TenantId};

use crate::{DetectionContext, FailedLoginTracker, IncidentDetectionEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Counted, below the next breach.
    Tracked { failures: u32 },
    /// Counted and reported to the detection engine.
    IncidentRaised { failures: u32, incident_id: IncidentId },
    /// Counted, but the engine could not record the breach.
    DetectionFailed { failures: u32 },
    /// The tracker could not count this failure.
    Untracked,
}

#[derive(Debug, Clone)]
pub struct LoginFailureMonitor {
    tracker: Arc<FailedLoginTracker>,
    engine: Arc<IncidentDetectionEngine>,
}

impl LoginFailureMonitor {
    pub fn new(tracker: Arc<FailedLoginTracker>, engine: Arc<IncidentDetectionEngine>) -> Self {
        Self { tracker, engine }
    }

    pub fn tracker(&self) -> &Arc<FailedLoginTracker> {
        &self.tracker
    }

    pub async fn on_login_failed(
        &self,
        identity: &IdentityFingerprint,
        ip: Option<IpAddr>,
        tenant_id: Option<TenantId>,
        at: DateTime<Utc>,
    ) -> MonitorOutcome {
        let counted = match self.tracker.record_failure(identity, ip, at) {
            Ok(counted) => counted,
            Err(e) => {
                tracing::warn!(subject = %identity, error = %e, "failed login not tracked");
                return MonitorOutcome::Untracked;
            }
        };
        let failures = counted.identity;

        if !counted.breached {
            return MonitorOutcome::Tracked { failures };
        }

        let context = DetectionContext {
            occurred_at: at,
            failure_count: failures,
        };
        match self.engine.on_threshold_exceeded(identity, tenant_id, context).await {
            Ok(incident) => MonitorOutcome::IncidentRaised {
                failures,
                incident_id: incident.id(),
            },
            Err(e) => {
                tracing::warn!(subject = %identity, code = e.code(), error = %e, "incident detection failed");
                MonitorOutcome::DetectionFailed { failures }
            }
        }
    }

    pub fn on_login_succeeded(&self, identity: &IdentityFingerprint) {
        self.tracker.record_success(identity);
    }
}
