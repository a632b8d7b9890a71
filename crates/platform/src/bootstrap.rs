//! One-time platform bootstrap: creates the first SUPER_ADMIN.
//!
//! The bootstrap secret is compared in constant time and never logged. The
//! flag and the admin are written together through
//! [`BootstrapStore::complete_bootstrap`], so concurrent attempts produce at
//! most one super admin.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use custodia_audit::{AuditError, AuditEvent, AuditEventName, AuditMetadata, AuditPolicy, AuditTrail, SafeValue};
use custodia_auth::{Actor, Role};
use custodia_core::{Clock, EmailHash, Entity, UserId, secrets_match};

use crate::password::validate_new_account;
use crate::{BootstrapError, BootstrapStore, PasswordHasher};

/// Operator-supplied details of the first super admin.
#[derive(Clone)]
pub struct SuperAdminInput {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

impl core::fmt::Debug for SuperAdminInput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SuperAdminInput").finish_non_exhaustive()
    }
}

/// Validated super admin ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSuperAdmin {
    pub id: UserId,
    pub email_hash: EmailHash,
    pub display_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Platform-scoped account (SUPER_ADMIN or DPO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUser {
    pub id: UserId,
    pub email_hash: EmailHash,
    pub display_name: String,
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for PlatformUser {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl From<NewSuperAdmin> for PlatformUser {
    fn from(admin: NewSuperAdmin) -> Self {
        Self {
            id: admin.id,
            email_hash: admin.email_hash,
            display_name: admin.display_name,
            role: Role::SuperAdmin,
            password_hash: admin.password_hash,
            created_at: admin.created_at,
        }
    }
}

/// Result of the compare-and-set in [`BootstrapStore::complete_bootstrap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created(PlatformUser),
    AlreadyBootstrapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BootstrapState {
    NotBootstrapped,
    Bootstrapped,
}

impl BootstrapState {
    pub fn from_flag(bootstrapped: bool) -> Self {
        if bootstrapped {
            BootstrapState::Bootstrapped
        } else {
            BootstrapState::NotBootstrapped
        }
    }

    pub fn is_bootstrapped(self) -> bool {
        self == BootstrapState::Bootstrapped
    }
}

/// Success response of a bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapCreated {
    pub created: bool,
    pub user_id: UserId,
}

pub struct BootstrapController {
    store: Arc<dyn BootstrapStore>,
    hasher: Arc<dyn PasswordHasher>,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
    secret: Option<String>,
}

impl BootstrapController {
    /// `secret` is the configured bootstrap secret; `None` rejects every attempt.
    pub fn new(
        store: Arc<dyn BootstrapStore>,
        hasher: Arc<dyn PasswordHasher>,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
        secret: Option<String>,
    ) -> Self {
        Self {
            store,
            hasher,
            audit,
            clock,
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub async fn status(&self) -> Result<BootstrapState, BootstrapError> {
        Ok(BootstrapState::from_flag(self.store.is_bootstrapped().await?))
    }

    /// Create the first super admin.
    ///
    /// Order matters: the secret is checked before anything is read, and the
    /// audit event is built before the write so a metadata failure cannot
    /// strand a committed bootstrap without its audit record.
    pub async fn bootstrap(
        &self,
        provided_secret: &str,
        input: SuperAdminInput,
    ) -> Result<BootstrapCreated, BootstrapError> {
        let Some(expected) = self.secret.as_deref() else {
            tracing::warn!("bootstrap attempted while no bootstrap secret is configured");
            return Err(BootstrapError::InvalidSecret);
        };
        if !secrets_match(provided_secret, expected) {
            tracing::warn!("bootstrap attempted with an invalid secret");
            return Err(BootstrapError::InvalidSecret);
        }

        if self.store.is_bootstrapped().await? {
            tracing::info!("bootstrap attempted on an already bootstrapped platform");
            return Err(BootstrapError::AlreadyBootstrapped);
        }

        let (email_hash, display_name) =
            validate_new_account(&input.email, &input.display_name, &input.password)?;
        let password_hash = self.hasher.hash(&input.password)?;
        let now = self.clock.now();

        let admin = NewSuperAdmin {
            id: UserId::new(),
            email_hash,
            display_name,
            password_hash,
            created_at: now,
        };

        let metadata = AuditMetadata::new()
            .with("role", Role::SuperAdmin)
            .and_then(|m| m.with("email_hash", SafeValue::hashed(&admin.email_hash)))
            .map_err(AuditError::from)?;
        let event = AuditEvent::new(AuditEventName::PlatformBootstrapCompleted, &Actor::system(), now)
            .with_target(admin.id)
            .with_metadata(metadata);

        let user = match self.store.complete_bootstrap(admin).await? {
            BootstrapOutcome::Created(user) => user,
            BootstrapOutcome::AlreadyBootstrapped => {
                tracing::info!("bootstrap lost a concurrent race");
                return Err(BootstrapError::AlreadyBootstrapped);
            }
        };

        if let Err(e) = self.audit.record(event, AuditPolicy::Critical).await {
            // The flag is set, so no retry can emit this record again.
            tracing::error!(
                user_id = %user.id,
                event = AuditEventName::PlatformBootstrapCompleted.as_str(),
                occurred_at = %now,
                error = %e,
                "platform bootstrapped without its audit record; restore it manually"
            );
            return Err(e.into());
        }

        tracing::info!(user_id = %user.id, "platform bootstrapped");
        Ok(BootstrapCreated {
            created: true,
            user_id: user.id,
        })
    }
}

impl core::fmt::Debug for BootstrapController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapController")
            .field("secret_configured", &self.secret.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_debug_redacts_credentials() {
        let input = SuperAdminInput {
            email: "root@example.com".into(),
            display_name: "Root".into(),
            password: "correct-horse-battery".into(),
        };
        let rendered = format!("{input:?}");
        assert!(!rendered.contains("root@example.com"));
        assert!(!rendered.contains("correct-horse"));
    }

    #[test]
    fn new_super_admin_becomes_platform_user_with_super_admin_role() {
        let admin = NewSuperAdmin {
            id: UserId::new(),
            email_hash: EmailHash::of("root@example.com").unwrap(),
            display_name: "Root".into(),
            password_hash: "$argon2id$...".into(),
            created_at: Utc::now(),
        };
        let user = PlatformUser::from(admin.clone());
        assert_eq!(user.role, Role::SuperAdmin);
        assert_eq!(user.id, admin.id);

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn state_tracks_flag() {
        assert!(BootstrapState::from_flag(true).is_bootstrapped());
        assert_eq!(BootstrapState::from_flag(false), BootstrapState::NotBootstrapped);
    }
}
