//! Interface names and interface configuration documents

use crate::config::validation;
use crate::error::{ControllerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Section header of the interface-level section
pub const INTERFACE_SECTION: &str = "Interface";

/// Section header of a peer section
pub const PEER_SECTION: &str = "Peer";

/// Directives that only make sense in the `[Interface]` section
const INTERFACE_ONLY_KEYS: &[&str] = &[
    "PrivateKey",
    "ListenPort",
    "FwMark",
    "Address",
    "DNS",
    "MTU",
    "Table",
    "PreUp",
    "PostUp",
    "PreDown",
    "PostDown",
    "SaveConfig",
];

/// Directives understood by `wg-quick` but rejected by `wg setconf`
const QUICK_ONLY_KEYS: &[&str] = &[
    "Address",
    "DNS",
    "MTU",
    "Table",
    "PreUp",
    "PostUp",
    "PreDown",
    "PostDown",
    "SaveConfig",
];

/// Validated interface name (reserved `wg` prefix, at most 15 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InterfaceName(String);

impl InterfaceName {
    /// Validate and wrap an interface name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validation::validate_interface_name(&name)?;
        Ok(Self(name))
    }

    /// Name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InterfaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for InterfaceName {
    type Error = ControllerError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<InterfaceName> for String {
    fn from(name: InterfaceName) -> Self {
        name.0
    }
}

/// Full desired configuration of one interface, kept as raw text.
///
/// Holds exactly one `[Interface]` section, which must come before any
/// `[Peer]` section. Peer sections may not carry interface-only directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfig(String);

impl InterfaceConfig {
    /// Validate and wrap a configuration document
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ControllerError::Validation(
                "Configuration cannot be empty".to_string(),
            ));
        }

        validate_structure(&text)?;
        Ok(Self(text))
    }

    /// Raw document text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Addresses listed by `Address` directives in the interface section.
    ///
    /// A directive may hold several comma-separated addresses.
    pub fn addresses(&self) -> Vec<String> {
        let mut section = None;
        let mut addresses = Vec::new();

        for line in self.0.lines() {
            if let Some(name) = section_header(line) {
                section = Some(name);
                continue;
            }

            if !section.is_some_and(|s| s.eq_ignore_ascii_case(INTERFACE_SECTION)) {
                continue;
            }

            if let Some((key, value)) = directive(line) {
                if key.eq_ignore_ascii_case("Address") {
                    addresses.extend(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|a| !a.is_empty())
                            .map(str::to_string),
                    );
                }
            }
        }

        addresses
    }

    /// Number of `[Peer]` sections
    pub fn peer_count(&self) -> usize {
        count_peer_sections(&self.0)
    }
}

impl fmt::Display for InterfaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name inside a `[Section]` header line, if `line` is one
pub(crate) fn section_header(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

/// `Key = Value` pair of a directive line; comments and blanks yield `None`
pub(crate) fn directive(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    trimmed
        .split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
}

/// Number of `[Peer]` headers in a document
pub fn count_peer_sections(text: &str) -> usize {
    text.lines()
        .filter_map(section_header)
        .filter(|name| name.eq_ignore_ascii_case(PEER_SECTION))
        .count()
}

/// Whether `key` is a wg-quick extension that `wg setconf` rejects
pub(crate) fn is_quick_only_key(key: &str) -> bool {
    QUICK_ONLY_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn is_interface_only_key(key: &str) -> bool {
    INTERFACE_ONLY_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn validate_structure(text: &str) -> Result<()> {
    let mut interface_sections = 0;
    let mut seen_peer = false;
    let mut in_peer = false;

    for (idx, line) in text.lines().enumerate() {
        if let Some(name) = section_header(line) {
            if name.eq_ignore_ascii_case(INTERFACE_SECTION) {
                if seen_peer {
                    return Err(ControllerError::Validation(format!(
                        "Line {}: [Interface] section must precede all [Peer] sections",
                        idx + 1
                    )));
                }
                interface_sections += 1;
                in_peer = false;
            } else if name.eq_ignore_ascii_case(PEER_SECTION) {
                seen_peer = true;
                in_peer = true;
            } else {
                return Err(ControllerError::Validation(format!(
                    "Line {}: unknown section [{}]",
                    idx + 1,
                    name
                )));
            }
            continue;
        }

        if in_peer {
            if let Some((key, _)) = directive(line) {
                if is_interface_only_key(key) {
                    return Err(ControllerError::Validation(format!(
                        "Line {}: '{}' is not allowed in a [Peer] section",
                        idx + 1,
                        key
                    )));
                }
            }
        }
    }

    match interface_sections {
        1 => Ok(()),
        0 => Err(ControllerError::Validation(
            "Configuration is missing an [Interface] section".to_string(),
        )),
        n => Err(ControllerError::Validation(format!(
            "Configuration has {} [Interface] sections, expected exactly one",
            n
        ))),
    }
}
