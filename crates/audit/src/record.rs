use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use custodia_auth::{Actor, ActorScope};
use custodia_core::{AuditEventId, TenantId, UserId};

use crate::{AuditEventName, AuditMetadata};

/// Immutable record of one completed operation.
///
/// Notes:
/// - Built once by the use case that performed the operation, after it succeeded.
/// - No setters: the builder methods consume `self` and the writer receives
///   the finished value.
/// - `metadata` can only hold [`SafeValue`](crate::SafeValue)s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    id: AuditEventId,
    name: AuditEventName,

    actor_scope: ActorScope,
    actor_id: Option<UserId>,

    /// Tenant whose data the operation touched (none for platform-wide events).
    tenant_id: Option<TenantId>,
    target_id: Option<Uuid>,

    metadata: AuditMetadata,
    occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(name: AuditEventName, actor: &Actor, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: AuditEventId::new(),
            name,
            actor_scope: actor.scope(),
            actor_id: actor.id(),
            tenant_id: None,
            target_id: None,
            metadata: AuditMetadata::new(),
            occurred_at,
        }
    }

    pub fn for_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn for_tenant_opt(mut self, tenant_id: Option<TenantId>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn with_target(mut self, target: impl Into<Uuid>) -> Self {
        self.target_id = Some(target.into());
        self
    }

    pub fn with_metadata(mut self, metadata: AuditMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn id(&self) -> AuditEventId {
        self.id
    }

    pub fn name(&self) -> AuditEventName {
        self.name
    }

    pub fn actor_scope(&self) -> ActorScope {
        self.actor_scope
    }

    pub fn actor_id(&self) -> Option<UserId> {
        self.actor_id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn target_id(&self) -> Option<Uuid> {
        self.target_id
    }

    pub fn metadata(&self) -> &AuditMetadata {
        &self.metadata
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
