//! Append-only audit trail.
//!
//! Use cases build an [`AuditEvent`] once an operation succeeded and hand it
//! to [`AuditTrail::record`] together with an explicit [`AuditPolicy`]. The
//! trail never reads, filters or deletes; querying belongs to whatever store
//! sits behind the [`AuditEventWriter`].

pub mod event;
pub mod metadata;
pub mod record;
pub mod tenant;
pub mod trail;
pub mod writer;

pub use event::AuditEventName;
pub use metadata::{AuditLabel, AuditMetadata, HashedId, MetadataError, SafeValue};
pub use record::AuditEvent;
pub use tenant::{TenantScoped, is_visible_to, visible_to};
pub use trail::{AuditError, AuditPolicy, AuditTrail, DEFAULT_AUDIT_TIMEOUT, Recorded};
pub use writer::AuditEventWriter;
