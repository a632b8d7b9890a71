//! `custodia-platform` — platform bootstrap and tenant administration.
//!
//! Use cases follow one shape: authorize through the guard, validate, perform
//! the effect through a repository contract, then record the audit event with
//! an explicit policy. Storage lives behind the traits in [`repository`].

pub mod bootstrap;
pub mod error;
pub mod password;
pub mod repository;
pub mod tenant;
pub mod tenant_user;

pub use bootstrap::{
    BootstrapController, BootstrapCreated, BootstrapOutcome, BootstrapState, NewSuperAdmin,
    PlatformUser, SuperAdminInput,
};
pub use error::{BootstrapError, PlatformError};
pub use password::{PasswordHashError, PasswordHasher};
pub use repository::{BootstrapStateRepo, BootstrapStore, PlatformUserRepo, TenantRepo, TenantUserRepo};
pub use tenant::{Tenant, TenantService, TenantSlug};
pub use tenant_user::{NewTenantUser, TenantUser, TenantUserInput, TenantUserService, UserStatus};
