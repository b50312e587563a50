//! Validation functions
//!
//! Covers controller settings as well as the values that end up on a host
//! command line: interface names, public keys and CIDR ranges. Everything
//! here runs before any command is executed.

use crate::error::{ControllerError, Result};
use std::net::IpAddr;

/// Reserved prefix every managed interface name starts with
pub const INTERFACE_PREFIX: &str = "wg";

/// Linux IFNAMSIZ minus the trailing NUL
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Longest command timeout accepted, in seconds
pub const MAX_TIMEOUT_SECS: u64 = 600;

/// Validate interface name (reserved prefix, max 15 chars)
pub fn validate_interface_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ControllerError::Validation(
            "Interface name cannot be empty".to_string(),
        ));
    }

    if !name.starts_with(INTERFACE_PREFIX) {
        return Err(ControllerError::Validation(format!(
            "Interface name '{}' must start with '{}'",
            name, INTERFACE_PREFIX
        )));
    }

    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(ControllerError::Validation(format!(
            "Interface name '{}' exceeds maximum length of {} characters",
            name, MAX_INTERFACE_NAME_LEN
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ControllerError::Validation(format!(
            "Interface name '{}' contains invalid characters (only alphanumeric, '_', and '-' allowed)",
            name
        )));
    }

    Ok(())
}

/// Validate CIDR notation (IP/prefix)
pub fn validate_cidr(cidr: &str) -> Result<()> {
    let (addr, prefix) = cidr.split_once('/').ok_or_else(|| {
        ControllerError::Validation(format!(
            "Invalid CIDR notation: {} (expected format: IP/prefix)",
            cidr
        ))
    })?;

    let ip: IpAddr = addr
        .parse()
        .map_err(|_| ControllerError::Validation(format!("Invalid IP address: {}", addr)))?;

    let prefix: u8 = prefix.parse().map_err(|_| {
        ControllerError::Validation(format!("Invalid prefix length in CIDR: {}", cidr))
    })?;

    let max_prefix = match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };

    if prefix > max_prefix {
        return Err(ControllerError::Validation(format!(
            "Prefix length {} exceeds maximum {} for IP address {}",
            prefix, max_prefix, addr
        )));
    }

    Ok(())
}

/// Validate base64-encoded public key
pub fn validate_public_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ControllerError::Validation(
            "Public key cannot be empty".to_string(),
        ));
    }

    // WireGuard keys are 32 bytes, base64 encoded = 44 characters (with padding)
    if key.len() != 44 {
        return Err(ControllerError::Validation(format!(
            "Invalid public key length: {} (expected 44 characters)",
            key.len()
        )));
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        return Err(ControllerError::Validation(
            "Public key contains invalid base64 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a requested keepalive interval (must be positive when given)
pub fn validate_keepalive(secs: u16) -> Result<()> {
    if secs == 0 {
        return Err(ControllerError::Validation(
            "Keepalive interval must be a positive number of seconds".to_string(),
        ));
    }
    Ok(())
}

/// Validate listen port
pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(ControllerError::Config(
            "Port number cannot be 0".to_string(),
        ));
    }
    Ok(())
}

/// Validate host command timeout
pub fn validate_timeout(secs: u64) -> Result<()> {
    if !(1..=MAX_TIMEOUT_SECS).contains(&secs) {
        return Err(ControllerError::Config(format!(
            "Command timeout {} is out of valid range (1-{})",
            secs, MAX_TIMEOUT_SECS
        )));
    }
    Ok(())
}
