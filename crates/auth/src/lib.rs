//! `custodia-auth` — scope model and the tenant authorization guard.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers hand
//! in an [`Actor`] and a target tenant, and receive a decision.

pub mod actor;
pub mod authorize;
pub mod claims;
pub mod roles;
pub mod scope;

pub use actor::{Actor, ActorError};
pub use authorize::{
    AuthzDecision, AuthzError, DenyReason, Ownership, PublicDenial, TenantAuthorizationGuard,
    authorize,
};
pub use claims::{ActorClaims, TokenValidationError, validate_claims};
pub use roles::Role;
pub use scope::{ActorScope, authority_of, can_act_on_tenant, has_role};
