//! Tenants and their administration by platform staff.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use custodia_audit::{AuditError, AuditEvent, AuditEventName, AuditMetadata, AuditPolicy, AuditTrail, SafeValue};
use custodia_auth::{Actor, AuthzError, Ownership, Role, TenantAuthorizationGuard};
use custodia_core::{
    Clock, DomainError, DomainResult, Entity, RepositoryError, TenantId, ValueObject,
};

use crate::{PlatformError, TenantRepo};

const MIN_SLUG_LEN: usize = 3;
const MAX_SLUG_LEN: usize = 63;
const MAX_NAME_LEN: usize = 128;

/// URL-safe tenant handle: lowercase ASCII letters, digits and inner hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantSlug(String);

impl TenantSlug {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let slug = raw.trim();
        let len = slug.len();
        if !(MIN_SLUG_LEN..=MAX_SLUG_LEN).contains(&len) {
            return Err(DomainError::validation(format!(
                "tenant slug must be {MIN_SLUG_LEN}-{MAX_SLUG_LEN} characters"
            )));
        }
        if !slug.bytes().all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-')) {
            return Err(DomainError::validation(
                "tenant slug may only contain lowercase letters, digits and hyphens",
            ));
        }
        if slug.starts_with('-') || slug.ends_with('-') {
            return Err(DomainError::validation("tenant slug cannot start or end with a hyphen"));
        }
        Ok(Self(slug.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for TenantSlug {}

impl core::fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantSlug {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantSlug> for String {
    fn from(value: TenantSlug) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub slug: TenantSlug,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(slug: TenantSlug, name: &str, created_at: DateTime<Utc>) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("tenant name cannot be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation("tenant name is too long"));
        }
        Ok(Self {
            id: TenantId::new(),
            slug,
            name: name.to_string(),
            created_at,
        })
    }
}

impl Entity for Tenant {
    type Id = TenantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

pub struct TenantService {
    tenants: Arc<dyn TenantRepo>,
    guard: TenantAuthorizationGuard,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
}

impl TenantService {
    pub fn new(
        tenants: Arc<dyn TenantRepo>,
        guard: TenantAuthorizationGuard,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tenants,
            guard,
            audit,
            clock,
        }
    }

    /// SUPER_ADMIN only. Audited as compliance-critical.
    pub async fn create_tenant(&self, actor: &Actor, slug: &str, name: &str) -> Result<Tenant, PlatformError> {
        self.guard.authorize(actor, &[Role::SuperAdmin], None)?;

        let slug = TenantSlug::parse(slug)?;
        let tenant = Tenant::new(slug, name, self.clock.now())?;

        if self.tenants.find_by_slug(&tenant.slug).await?.is_some() {
            return Err(PlatformError::SlugTaken);
        }

        let metadata = SafeValue::label(tenant.slug.as_str())
            .and_then(|slug| AuditMetadata::new().with("slug", slug))
            .map_err(AuditError::from)?;
        let event = AuditEvent::new(AuditEventName::TenantCreated, actor, tenant.created_at)
            .for_tenant(tenant.id)
            .with_target(tenant.id)
            .with_metadata(metadata);

        match self.tenants.create(tenant.clone()).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => return Err(PlatformError::SlugTaken),
            Err(e) => return Err(e.into()),
        }

        self.audit.record(event, AuditPolicy::Critical).await?;

        tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, "tenant created");
        Ok(tenant)
    }

    /// Any platform role, or a tenant member of that same tenant.
    ///
    /// Tenant actors get the same denial for a missing tenant as for a
    /// foreign one.
    pub async fn get_tenant(&self, actor: &Actor, tenant_id: TenantId) -> Result<Tenant, PlatformError> {
        let mut loaded = None;
        let lookup = async {
            let found = self.tenants.find_by_id(tenant_id).await?;
            let owner = found.as_ref().map(|t| Ownership::Tenant(t.id));
            loaded = found;
            Ok::<_, RepositoryError>(owner)
        };

        let roles = [Role::SuperAdmin, Role::Dpo, Role::TenantAdmin, Role::TenantUser];
        match self.guard.authorize_resource(actor, &roles, lookup).await {
            Ok(_) => {}
            Err(AuthzError::ResourceMissing) => return Err(PlatformError::NotFound),
            Err(e) => return Err(e.into()),
        }
        let tenant = loaded.ok_or(PlatformError::NotFound)?;

        let event = AuditEvent::new(AuditEventName::TenantViewed, actor, self.clock.now())
            .for_tenant(tenant.id)
            .with_target(tenant.id);
        self.audit.record(event, AuditPolicy::for_event(AuditEventName::TenantViewed)).await?;

        Ok(tenant)
    }
}

impl core::fmt::Debug for TenantService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TenantService")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn slug_accepts_lowercase_handles() {
        assert_eq!(TenantSlug::parse("acme").unwrap().as_str(), "acme");
        assert_eq!(TenantSlug::parse(" globex-eu-2 ").unwrap().as_str(), "globex-eu-2");
    }

    #[test]
    fn slug_rejects_bad_shapes() {
        for bad in ["ab", "Acme", "acme_corp", "-acme", "acme-", "ac me", ""] {
            assert!(TenantSlug::parse(bad).is_err(), "{bad} should be rejected");
        }
        assert!(TenantSlug::parse(&"a".repeat(64)).is_err());
    }

    #[test]
    fn tenant_name_is_required() {
        let slug = TenantSlug::parse("acme").unwrap();
        assert!(Tenant::new(slug.clone(), "   ", Utc::now()).is_err());
        assert_eq!(Tenant::new(slug, " Acme Corp ", Utc::now()).unwrap().name, "Acme Corp");
    }

    #[test]
    fn slug_deserialization_validates() {
        assert!(serde_json::from_str::<TenantSlug>("\"acme\"").is_ok());
        assert!(serde_json::from_str::<TenantSlug>("\"ACME\"").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn valid_slugs_are_usable_as_audit_labels(slug in "[a-z0-9][a-z0-9-]{1,40}[a-z0-9]") {
            let parsed = TenantSlug::parse(&slug).unwrap();
            prop_assert!(SafeValue::label(parsed.as_str()).is_ok());
        }
    }
}
