use std::sync::Arc;

use async_trait::async_trait;

use custodia_core::RepositoryResult;

use crate::AuditEvent;

/// Durable sink for audit events (append-only).
///
/// Implementations must persist each event exactly once and never expose an
/// update or delete path; retention is handled outside the application.
#[async_trait]
pub trait AuditEventWriter: Send + Sync {
    async fn write(&self, event: AuditEvent) -> RepositoryResult<()>;
}

#[async_trait]
impl<W> AuditEventWriter for Arc<W>
where
    W: AuditEventWriter + ?Sized,
{
    async fn write(&self, event: AuditEvent) -> RepositoryResult<()> {
        (**self).write(event).await
    }
}
