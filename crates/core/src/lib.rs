//! `custodia-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, error types, hashing of personal identifiers and the clock
//! abstraction every time-windowed component reads from.

pub mod aggregate;
pub mod clock;
pub mod entity;
pub mod error;
pub mod hash;
pub mod id;
pub mod repository;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use hash::{EmailHash, IdentityFingerprint, secrets_match};
pub use id::{AuditEventId, IncidentId, TenantId, UserId};
pub use repository::{RepositoryError, RepositoryResult};
pub use value_object::ValueObject;
