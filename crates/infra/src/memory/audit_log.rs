use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use custodia_audit::{AuditEvent, AuditEventName, AuditEventWriter, visible_to};
use custodia_auth::Actor;
use custodia_core::{RepositoryError, RepositoryResult};

use super::poisoned;

/// Append-only audit log.
///
/// Write failures and latency can be injected to exercise the critical and
/// best-effort audit paths.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    events: RwLock<Vec<AuditEvent>>,
    failing: AtomicBool,
    delay_ms: AtomicU64,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every subsequent write.
    pub fn delay_writes(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn events_named(&self, name: AuditEventName) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.name() == name)
            .collect()
    }

    /// The audit view `actor` is allowed to query.
    pub fn view_for(&self, actor: &Actor) -> Vec<AuditEvent> {
        let events = self.events();
        visible_to(actor, &events).into_iter().cloned().collect()
    }
}

#[async_trait]
impl AuditEventWriter for InMemoryAuditLog {
    async fn write(&self, event: AuditEvent) -> RepositoryResult<()> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("audit log rejected the write".to_string()));
        }
        self.events.write().map_err(poisoned)?.push(event);
        Ok(())
    }
}
