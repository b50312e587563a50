//! wg-controller: WireGuard interface reconciliation controller
//!
//! This library converges named WireGuard interfaces on a Linux host onto
//! configurations pushed by a provisioning backend. It drives the host's own
//! tools (`ip`, `wg`, `wg-quick`) and falls back through progressively more
//! disruptive strategies when the gentler ones fail.
//!
//! # Architecture
//!
//! The controller is a small privileged daemon. The backend owns desired
//! state; the controller only applies it, persisting each configuration to
//! disk and keeping concurrent requests for the same interface strictly
//! serialized.
//!
//! # Modules
//!
//! - `config`: Controller settings and input validation
//! - `executor`: Host command execution
//! - `wireguard`: Interface names, configurations, storage, probing, peers
//! - `reconcile`: Create/reload strategy ladders and per-interface locking
//! - `control`: HTTP control API
//! - `security`: File permissions, bearer auth, privilege detection
//! - `error`: Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod control;
pub mod error;
pub mod executor;
pub mod reconcile;
pub mod security;
pub mod wireguard;

// Re-export commonly used types
pub use error::{ControllerError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
