//! Configuration management
//!
//! This module handles the controller's own settings: where to listen, the
//! API credential, where interface configurations are stored and how long a
//! host command may run. Settings come from an optional TOML file and are
//! then overridden by environment variables.

mod toml_parser;
pub mod validation;

pub use toml_parser::TomlConfig;

use crate::error::{ControllerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the bearer credential
pub const API_KEY_ENV: &str = "WIREGUARD_API_KEY";

/// Environment variable overriding the interface configuration directory
pub const CONFIG_DIR_ENV: &str = "WG_CONTROLLER_CONFIG_DIR";

/// Placeholder credential used when none is configured
pub const DEFAULT_API_KEY: &str = "change-me-in-production";

/// Default path of the controller settings file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/wg-controller/config.toml";

/// Complete controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// API authentication settings
    pub auth: AuthConfig,

    /// Interface configuration storage
    pub storage: StorageConfig,

    /// Host command execution settings
    pub commands: CommandConfig,

    /// Peer defaults
    pub peers: PeerDefaults,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP API
    pub bind_address: String,

    /// Bind port for the HTTP API
    pub port: u16,
}

/// API authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared bearer secret
    pub api_key: String,
}

/// Where interface configurations live on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `<name>.conf` and `<name>_peers.conf`
    pub config_dir: PathBuf,
}

/// Host command execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Upper bound on a single host command, in seconds
    pub timeout_secs: u64,
}

/// Defaults applied to peer mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerDefaults {
    /// Keepalive used when a request omits one (0 disables)
    pub default_keepalive_secs: u16,
}

impl ControllerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml_config = TomlConfig::from_file(path)?;
        Ok(toml_config.into())
    }

    /// Load configuration for start-up.
    ///
    /// An explicitly given path must exist. Without one, the default path is
    /// read when present and built-in defaults are used otherwise. Environment
    /// overrides are applied last and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => {
                debug!("No config file at {}, using defaults", DEFAULT_CONFIG_PATH);
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override settings from the process environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.auth.api_key = key;
            }
        }

        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            if !dir.is_empty() {
                self.storage.config_dir = PathBuf::from(dir);
            }
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_port(self.server.port)?;
        validation::validate_timeout(self.commands.timeout_secs)?;

        if self.auth.api_key.is_empty() {
            return Err(ControllerError::Config(
                "API key cannot be empty".to_string(),
            ));
        }

        if self.storage.config_dir.as_os_str().is_empty() {
            return Err(ControllerError::Config(
                "Storage directory cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether the placeholder credential is still in use
    pub fn uses_default_api_key(&self) -> bool {
        self.auth.api_key == DEFAULT_API_KEY
    }

    /// Host command timeout as a duration
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.commands.timeout_secs)
    }

    /// Socket address string for the HTTP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            commands: CommandConfig::default(),
            peers: PeerDefaults::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PeerDefaults {
    fn default() -> Self {
        Self {
            default_keepalive_secs: default_keepalive(),
        }
    }
}

// Default value functions for serde
pub(crate) fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_config_dir() -> PathBuf {
    PathBuf::from("/etc/wireguard")
}

pub(crate) fn default_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_keepalive() -> u16 {
    25
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.storage.config_dir, PathBuf::from("/etc/wireguard"));
        assert_eq!(config.command_timeout(), Duration::from_secs(30));
        assert_eq!(config.peers.default_keepalive_secs, 25);
        assert!(config.uses_default_api_key());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var(API_KEY_ENV, "s3cret");
        std::env::set_var(CONFIG_DIR_ENV, "/tmp/wg-test");

        let mut config = ControllerConfig::default();
        config.apply_env_overrides();

        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(CONFIG_DIR_ENV);

        assert_eq!(config.auth.api_key, "s3cret");
        assert_eq!(config.storage.config_dir, PathBuf::from("/tmp/wg-test"));
        assert!(!config.uses_default_api_key());
    }

    #[test]
    #[serial]
    fn test_empty_env_is_ignored() {
        std::env::set_var(API_KEY_ENV, "");

        let mut config = ControllerConfig::default();
        config.apply_env_overrides();

        std::env::remove_var(API_KEY_ENV);

        assert_eq!(config.auth.api_key, DEFAULT_API_KEY);
    }

    #[test]
    #[serial]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                [server]
                port = 9000

                [auth]
                api_key = "from-file"
            "#,
        )
        .unwrap();

        let config = ControllerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.api_key, "from-file");
        assert_eq!(config.server.bind_address, "0.0.0.0");
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = ControllerConfig::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(ControllerError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_api_key() {
        let mut config = ControllerConfig::default();
        config.auth.api_key.clear();
        assert!(config.validate().is_err());
    }
}
