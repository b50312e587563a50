//! Privilege detection
//!
//! The host tools need CAP_NET_ADMIN; the controller does not try to gain or
//! drop privileges itself, it only reports what it is running with.

use tracing::{info, warn};

/// Privilege level of the current process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// Running as root (uid or euid 0)
    Root,
    /// Running as regular user
    User,
    /// Unknown privilege level
    Unknown,
}

impl PrivilegeLevel {
    /// Detect current privilege level
    pub fn detect() -> Self {
        #[cfg(unix)]
        {
            let uid = unsafe { libc::getuid() };
            let euid = unsafe { libc::geteuid() };

            if uid == 0 || euid == 0 {
                return Self::Root;
            }
            Self::User
        }

        #[cfg(not(unix))]
        {
            Self::Unknown
        }
    }

    /// Check if elevated
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Root)
    }
}

impl std::fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::User => write!(f, "user"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Log the privilege level; host commands are expected to fail without root
pub fn check_privileges() -> PrivilegeLevel {
    let level = PrivilegeLevel::detect();
    if level.is_elevated() {
        info!("Running with {} privileges", level);
    } else {
        warn!(
            "Running as {}: ip/wg/wg-quick need root or CAP_NET_ADMIN and will likely fail",
            level
        );
    }
    level
}
