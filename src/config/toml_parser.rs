//! TOML configuration file parser
//!
//! Every section and field is optional; anything omitted falls back to the
//! built-in default.

use crate::config::{
    default_bind_address, default_config_dir, default_keepalive, default_port,
    default_timeout_secs, AuthConfig, CommandConfig, ControllerConfig, PeerDefaults,
    ServerConfig, StorageConfig, DEFAULT_API_KEY,
};
use crate::error::{ControllerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// `[server]` section
    #[serde(default)]
    pub server: Option<TomlServerConfig>,

    /// `[auth]` section
    #[serde(default)]
    pub auth: Option<TomlAuthConfig>,

    /// `[storage]` section
    #[serde(default)]
    pub storage: Option<TomlStorageConfig>,

    /// `[commands]` section
    #[serde(default)]
    pub commands: Option<TomlCommandConfig>,

    /// `[peers]` section
    #[serde(default)]
    pub peers: Option<TomlPeerDefaults>,
}

/// TOML `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlServerConfig {
    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// TOML `[auth]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlAuthConfig {
    /// Shared bearer secret
    pub api_key: Option<String>,
}

/// TOML `[storage]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlStorageConfig {
    /// Interface configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
}

/// TOML `[commands]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlCommandConfig {
    /// Per-command timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// TOML `[peers]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlPeerDefaults {
    /// Keepalive applied when a request omits one
    #[serde(default = "default_keepalive")]
    pub default_keepalive_secs: u16,
}

impl TomlConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ControllerError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| {
            ControllerError::Config(format!("Failed to parse TOML config: {}", e))
        })
    }
}

// Convert TOML config to internal config
impl From<TomlConfig> for ControllerConfig {
    fn from(toml: TomlConfig) -> Self {
        ControllerConfig {
            server: toml
                .server
                .map(|s| ServerConfig {
                    bind_address: s.bind_address,
                    port: s.port,
                })
                .unwrap_or_default(),
            auth: AuthConfig {
                api_key: toml
                    .auth
                    .and_then(|a| a.api_key)
                    .unwrap_or_else(|| DEFAULT_API_KEY.to_string()),
            },
            storage: toml
                .storage
                .map(|s| StorageConfig {
                    config_dir: s.config_dir,
                })
                .unwrap_or_default(),
            commands: toml
                .commands
                .map(|c| CommandConfig {
                    timeout_secs: c.timeout_secs,
                })
                .unwrap_or_default(),
            peers: toml
                .peers
                .map(|p| PeerDefaults {
                    default_keepalive_secs: p.default_keepalive_secs,
                })
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [server]
            bind_address = "127.0.0.1"
            port = 8443

            [auth]
            api_key = "topsecret"

            [storage]
            config_dir = "/var/lib/wg-controller"

            [commands]
            timeout_secs = 10

            [peers]
            default_keepalive_secs = 0
        "#;

        let config: ControllerConfig = TomlConfig::parse(toml).expect("Failed to parse TOML").into();
        assert_eq!(config.listen_addr(), "127.0.0.1:8443");
        assert_eq!(config.auth.api_key, "topsecret");
        assert_eq!(
            config.storage.config_dir,
            PathBuf::from("/var/lib/wg-controller")
        );
        assert_eq!(config.commands.timeout_secs, 10);
        assert_eq!(config.peers.default_keepalive_secs, 0);
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config: ControllerConfig = TomlConfig::parse("").expect("Failed to parse TOML").into();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.api_key, DEFAULT_API_KEY);
        assert_eq!(config.storage.config_dir, PathBuf::from("/etc/wireguard"));
        assert_eq!(config.commands.timeout_secs, 30);
    }

    #[test]
    fn test_parse_partial_section() {
        let toml = r#"
            [server]
            port = 9090
        "#;

        let config: ControllerConfig = TomlConfig::parse(toml).expect("Failed to parse TOML").into();
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = TomlConfig::parse("[server\nport = ");
        assert!(matches!(result, Err(ControllerError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("controller.toml");
        std::fs::write(&path, "[commands]\ntimeout_secs = 5\n").unwrap();

        let config = ControllerConfig::from_file(&path).unwrap();
        assert_eq!(config.commands.timeout_secs, 5);
    }
}
