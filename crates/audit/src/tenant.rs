use custodia_auth::Actor;
use custodia_core::TenantId;

use crate::AuditEvent;

/// Helper trait for tenant-scoped records.
///
/// Records without a tenant are platform-wide and only visible to platform
/// and system actors.
pub trait TenantScoped {
    fn tenant_id(&self) -> Option<TenantId>;
}

impl TenantScoped for AuditEvent {
    fn tenant_id(&self) -> Option<TenantId> {
        AuditEvent::tenant_id(self)
    }
}

pub fn is_visible_to<T: TenantScoped + ?Sized>(actor: &Actor, record: &T) -> bool {
    if actor.scope().is_cross_tenant() {
        return true;
    }
    record.tenant_id().is_some() && record.tenant_id() == actor.tenant_id()
}

/// Filter records down to what `actor` may observe.
pub fn visible_to<'a, T, I>(actor: &Actor, records: I) -> Vec<&'a T>
where
    T: TenantScoped + 'a,
    I: IntoIterator<Item = &'a T>,
{
    records
        .into_iter()
        .filter(|record| is_visible_to(actor, *record))
        .collect()
}
