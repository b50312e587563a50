//! Security hardening
//!
//! - Owner-only permissions on stored interface configurations
//! - Constant-time bearer token checks for the control API
//! - Privilege detection at start-up

mod auth;
mod permissions;
mod privileges;

pub use auth::BearerAuth;
pub use permissions::{set_secure_permissions, SecureFileMode};
pub use privileges::{check_privileges, PrivilegeLevel};
