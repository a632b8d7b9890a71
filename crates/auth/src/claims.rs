use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use custodia_core::{TenantId, UserId};

use crate::{Actor, ActorError, ActorScope, Role};

/// Access-token claims model (transport-agnostic).
///
/// This is the minimal set of claims expected once a token has been decoded
/// and its signature verified by whatever transport layer is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorClaims {
    /// Subject / account identifier.
    pub sub: UserId,

    pub scope: ActorScope,

    pub role: Role,

    /// Present iff `scope` is `TENANT`.
    pub tenant_id: Option<TenantId>,

    pub issued_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    /// SYSTEM authority is never delegated through a token.
    #[error("system scope cannot be claimed by a token")]
    SystemScopeNotAllowed,

    #[error("tenant claim present iff scope is TENANT")]
    TenantClaimMismatch,

    #[error(transparent)]
    Actor(#[from] ActorError),
}

/// Deterministically validate token claims.
///
/// Note: this validates the *claims* only. Signature verification / decoding is
/// intentionally outside this crate.
pub fn validate_claims(claims: &ActorClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

impl Actor {
    /// Build the request actor from validated claims.
    pub fn from_claims(claims: &ActorClaims, now: DateTime<Utc>) -> Result<Self, TokenValidationError> {
        validate_claims(claims, now)?;
        match (claims.scope, claims.tenant_id) {
            (ActorScope::System, _) => Err(TokenValidationError::SystemScopeNotAllowed),
            (ActorScope::Platform, None) => Ok(Actor::platform(claims.sub, claims.role)?),
            (ActorScope::Tenant, Some(tenant_id)) => {
                Ok(Actor::tenant(claims.sub, tenant_id, claims.role)?)
            }
            _ => Err(TokenValidationError::TenantClaimMismatch),
        }
    }
}
