//! File permission enforcement
//!
//! Interface configuration files carry private keys, so they are kept
//! readable and writable by the owning user only.

use crate::error::ControllerError;
use std::path::Path;
use tracing::debug;

/// Secure file mode requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureFileMode {
    /// Interface configuration or peers file (0600)
    OwnerOnly,
    /// Configuration directory (0700)
    Directory,
}

impl SecureFileMode {
    /// Get the maximum allowed permission mode
    #[cfg(unix)]
    pub fn max_mode(&self) -> u32 {
        match self {
            Self::OwnerOnly => 0o600,
            Self::Directory => 0o700,
        }
    }
}

/// Set secure file permissions
#[cfg(unix)]
pub fn set_secure_permissions(path: &Path, mode: SecureFileMode) -> Result<(), ControllerError> {
    use std::os::unix::fs::PermissionsExt;

    let perms = std::fs::Permissions::from_mode(mode.max_mode());
    std::fs::set_permissions(path, perms).map_err(|e| {
        ControllerError::Security(format!("Failed to set permissions on {:?}: {}", path, e))
    })?;

    debug!("Set secure permissions on {:?}: {:o}", path, mode.max_mode());
    Ok(())
}

/// Set secure file permissions (non-Unix stub)
#[cfg(not(unix))]
pub fn set_secure_permissions(path: &Path, _mode: SecureFileMode) -> Result<(), ControllerError> {
    debug!("Permission setting not implemented for this platform: {:?}", path);
    Ok(())
}
