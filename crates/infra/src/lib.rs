//! Infrastructure layer: in-memory stores, password hashing, configuration
//! and background jobs.
//!
//! The in-memory adapters implement every repository contract of the domain
//! crates. They are meant for tests and single-process development setups.

pub mod config;
pub mod jobs;
pub mod memory;
pub mod password;

pub use config::{ConfigError, CustodiaConfig};
pub use jobs::{SweeperHandle, spawn_tracker_sweeper};
pub use memory::{
    InMemoryAuditLog, InMemoryIncidentRepo, InMemoryPlatformStore, InMemoryTenantRepo, InMemoryTenantUserRepo,
};
pub use password::Argon2PasswordHasher;
