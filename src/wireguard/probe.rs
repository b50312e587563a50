//! Live interface state queries

use crate::executor::{CommandExecutor, HostCommand};
use crate::wireguard::InterfaceName;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw live status of an interface, for presentation only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStatus {
    /// Output of `wg show <name>`
    pub wireguard_info: String,
    /// Output of `ip addr show <name>`
    pub ip_info: String,
}

/// One entry of the host-wide interface listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSummary {
    /// Interface name as reported by `wg show interfaces`
    pub name: String,
    /// `wg show <name>` output, `None` when that query failed
    pub info: Option<String>,
}

/// Queries the host for interface existence and status
pub struct StateProbe<E> {
    executor: Arc<E>,
}

impl<E: CommandExecutor> StateProbe<E> {
    /// Create a probe using `executor`
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }

    /// Whether the link exists.
    ///
    /// Any non-zero exit of the link query counts as absent, including
    /// failures unrelated to the device being missing.
    pub async fn exists(&self, name: &InterfaceName) -> bool {
        let result = self
            .executor
            .run(&HostCommand::new("ip", ["link", "show", name.as_str()]))
            .await;
        debug!("Interface {} exists: {}", name, result.succeeded);
        result.succeeded
    }

    /// Live `wg show` dump; empty when the query fails
    pub async fn wireguard_info(&self, name: &InterfaceName) -> String {
        let result = self
            .executor
            .run(&HostCommand::new("wg", ["show", name.as_str()]))
            .await;
        result.stdout
    }

    /// Live WireGuard and address-table dumps
    pub async fn describe(&self, name: &InterfaceName) -> RuntimeStatus {
        let wireguard_info = self.wireguard_info(name).await;
        let ip_info = self
            .executor
            .run(&HostCommand::new("ip", ["addr", "show", name.as_str()]))
            .await
            .stdout;

        RuntimeStatus {
            wireguard_info,
            ip_info,
        }
    }

    /// Names of all WireGuard interfaces on the host; empty on query failure
    pub async fn list_interfaces(&self) -> Vec<String> {
        let result = self
            .executor
            .run(&HostCommand::new("wg", ["show", "interfaces"]))
            .await;

        if !result.succeeded {
            warn!("Failed to list interfaces: {}", result.diagnostic());
            return Vec::new();
        }

        result
            .stdout
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Every WireGuard interface on the host with its live dump.
    ///
    /// Names come from the host rather than from callers, so they are not
    /// held to the managed naming rules.
    pub async fn summarize_all(&self) -> Vec<InterfaceSummary> {
        let mut summaries = Vec::new();
        for name in self.list_interfaces().await {
            let result = self
                .executor
                .run(&HostCommand::new("wg", ["show", name.as_str()]))
                .await;
            summaries.push(InterfaceSummary {
                info: result.succeeded.then_some(result.stdout),
                name,
            });
        }
        summaries
    }
}

impl<E> Clone for StateProbe<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}
