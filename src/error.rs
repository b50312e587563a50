//! Error types for wg-controller
//!
//! This module defines the error types used throughout the controller.
//! We use `thiserror` for ergonomic error definitions and `anyhow` for
//! error propagation in the binary.

use crate::reconcile::Stage;
use thiserror::Error;

/// Main error type for controller operations
#[derive(Error, Debug)]
pub enum ControllerError {
    /// Malformed input (interface name, key, CIDR, empty config, missing field)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or wrong bearer credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Every create strategy failed; carries the last stage attempted
    #[error("Failed to create interface at stage {stage}: {diagnostic}")]
    CreateFailed {
        /// Last stage attempted
        stage: Stage,
        /// Raw diagnostic output of that stage
        diagnostic: String,
    },

    /// Every reload strategy failed; the interface may be left down
    #[error("Failed to reload interface at stage {stage}: {diagnostic}")]
    ReloadFailed {
        /// Last stage attempted
        stage: Stage,
        /// Raw diagnostic output of that stage
        diagnostic: String,
    },

    /// The set-peer command reported a non-zero exit
    #[error("Peer operation failed: {0}")]
    PeerOperationFailed(String),

    /// Controller configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure writing or reading a stored interface configuration
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Security-related errors (file permissions, privileges)
    #[error("Security error: {0}")]
    Security(String),

    /// Unexpected runtime failure, such as a panicked operation task
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using ControllerError
pub type Result<T> = std::result::Result<T, ControllerError>;

impl From<serde_json::Error> for ControllerError {
    fn from(err: serde_json::Error) -> Self {
        ControllerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ControllerError {
    fn from(err: toml::de::Error) -> Self {
        ControllerError::Config(err.to_string())
    }
}
