use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use custodia_core::AuditEventId;

use crate::{AuditEvent, AuditEventName, AuditEventWriter, MetadataError};

pub const DEFAULT_AUDIT_TIMEOUT: Duration = Duration::from_secs(2);

/// What the caller does when the write fails.
///
/// There is no default: every call site states its policy, either directly
/// or through [`AuditPolicy::for_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditPolicy {
    /// The parent operation fails with `AUDIT_WRITE_FAILED`.
    Critical,
    /// The failure is logged and the parent operation continues.
    BestEffort,
}

impl AuditPolicy {
    /// Sensitive reads are best-effort; every state change is critical.
    pub fn for_event(name: AuditEventName) -> Self {
        if name.is_sensitive_read() {
            AuditPolicy::BestEffort
        } else {
            AuditPolicy::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Written(AuditEventId),
    /// Best-effort write that failed and was downgraded to a warning.
    Skipped,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Writer error or timeout.
    #[error("audit write failed: {0}")]
    WriteFailed(String),

    /// The event could not be built from safe values, so nothing was written.
    #[error("audit metadata rejected: {0}")]
    MetadataRejected(#[from] MetadataError),
}

impl AuditError {
    pub fn code(&self) -> &'static str {
        "AUDIT_WRITE_FAILED"
    }
}

/// Records audit events through an [`AuditEventWriter`], bounded by a timeout.
#[derive(Clone)]
pub struct AuditTrail {
    writer: Arc<dyn AuditEventWriter>,
    timeout: Duration,
}

impl AuditTrail {
    pub fn new(writer: Arc<dyn AuditEventWriter>) -> Self {
        Self {
            writer,
            timeout: DEFAULT_AUDIT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn record(&self, event: AuditEvent, policy: AuditPolicy) -> Result<Recorded, AuditError> {
        self.record_within(event, policy, self.timeout).await
    }

    pub async fn record_within(
        &self,
        event: AuditEvent,
        policy: AuditPolicy,
        timeout: Duration,
    ) -> Result<Recorded, AuditError> {
        let id = event.id();
        let name = event.name();

        let failure = match tokio::time::timeout(timeout, self.writer.write(event)).await {
            Ok(Ok(())) => {
                tracing::debug!(event = name.as_str(), audit_id = %id, "audit event recorded");
                return Ok(Recorded::Written(id));
            }
            Ok(Err(e)) => AuditError::WriteFailed(e.to_string()),
            Err(_) => AuditError::WriteFailed(format!("timed out after {}ms", timeout.as_millis())),
        };

        match policy {
            AuditPolicy::Critical => {
                tracing::error!(event = name.as_str(), audit_id = %id, error = %failure, "compliance-critical audit write failed");
                Err(failure)
            }
            AuditPolicy::BestEffort => {
                tracing::warn!(event = name.as_str(), audit_id = %id, error = %failure, "best-effort audit write dropped");
                Ok(Recorded::Skipped)
            }
        }
    }
}

impl core::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
