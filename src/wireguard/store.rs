//! On-disk interface configuration store
//!
//! Each interface owns two files under the store directory: the full
//! configuration `<name>.conf`, consumed by `wg-quick`, and the peers-only
//! projection `<name>_peers.conf`, consumed by `wg syncconf`. Both are
//! written owner read/write only and are never deleted by the controller.

use crate::error::{ControllerError, Result};
use crate::security::{set_secure_permissions, SecureFileMode};
use crate::wireguard::interface::{is_quick_only_key, section_header, directive, INTERFACE_SECTION};
use crate::wireguard::{InterfaceConfig, InterfaceName};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads and writes interface configuration files
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the full configuration for `name`
    pub fn config_path(&self, name: &InterfaceName) -> PathBuf {
        self.dir.join(format!("{}.conf", name))
    }

    /// Path of the peers-only projection for `name`
    pub fn peers_path(&self, name: &InterfaceName) -> PathBuf {
        self.dir.join(format!("{}_peers.conf", name))
    }

    /// Persist the full configuration with owner-only permissions
    pub fn write(&self, name: &InterfaceName, config: &InterfaceConfig) -> Result<PathBuf> {
        let path = self.config_path(name);
        self.write_file(&path, config.as_str())?;
        info!("Config written to {}", path.display());
        Ok(path)
    }

    /// Derive and persist the peers-only projection of `config`
    pub fn write_peers_only(&self, name: &InterfaceName, config: &InterfaceConfig) -> Result<PathBuf> {
        let path = self.peers_path(name);
        self.write_file(&path, &Self::derive_peers_only(config))?;
        info!("Peers-only config written to {}", path.display());
        Ok(path)
    }

    /// Project a full configuration down to its peer sections.
    ///
    /// Single pass: the `[Interface]` header and every line up to the next
    /// section header are dropped, everything else is kept verbatim, in
    /// order, with its original line endings.
    pub fn derive_peers_only(config: &InterfaceConfig) -> String {
        derive_peers_only(config.as_str())
    }

    /// Remove wg-quick extensions so the result is accepted by `wg setconf`
    pub fn strip_quick_directives(config: &InterfaceConfig) -> String {
        let mut in_interface = false;
        let mut out = String::with_capacity(config.as_str().len());

        for line in config.as_str().split_inclusive('\n') {
            if let Some(name) = section_header(line) {
                in_interface = name.eq_ignore_ascii_case(INTERFACE_SECTION);
            } else if in_interface {
                if let Some((key, _)) = directive(line) {
                    if is_quick_only_key(key) {
                        continue;
                    }
                }
            }
            out.push_str(line);
        }

        out
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                ControllerError::Storage(format!(
                    "Failed to create config directory {}: {}",
                    self.dir.display(),
                    e
                ))
            })?;
            set_secure_permissions(&self.dir, SecureFileMode::Directory)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(SecureFileMode::OwnerOnly.max_mode());
        }

        let mut file = options.open(path).map_err(|e| {
            ControllerError::Storage(format!("Failed to open {}: {}", path.display(), e))
        })?;
        file.write_all(contents.as_bytes()).map_err(|e| {
            ControllerError::Storage(format!("Failed to write {}: {}", path.display(), e))
        })?;

        // Creation mode does not apply to a file that already existed
        set_secure_permissions(path, SecureFileMode::OwnerOnly)?;
        debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(())
    }
}

/// Peers-only projection of a raw configuration document
pub fn derive_peers_only(config: &str) -> String {
    let mut in_interface = false;
    let mut out = String::with_capacity(config.len());

    for line in config.split_inclusive('\n') {
        if let Some(name) = section_header(line) {
            in_interface = name.eq_ignore_ascii_case(INTERFACE_SECTION);
            if in_interface {
                continue;
            }
        }

        if !in_interface {
            out.push_str(line);
        }
    }

    out
}
