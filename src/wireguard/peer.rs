//! Live peer mutation
//!
//! Adds or removes a single peer on a running interface with `wg set`,
//! leaving every other peer and all established sessions untouched.

use crate::config::validation;
use crate::error::{ControllerError, Result};
use crate::executor::{CommandExecutor, HostCommand};
use crate::reconcile::InterfaceLocks;
use crate::wireguard::{ConfigStore, InterfaceName};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Desired state of one peer, identified by its public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSpec {
    /// Base64-encoded public key
    pub public_key: String,
    /// Allowed IP ranges (CIDR notation)
    pub allowed_ips: Vec<String>,
    /// Persistent keepalive interval in seconds
    pub keepalive_secs: Option<u16>,
}

impl PeerSpec {
    /// Validate and build a peer specification
    pub fn new(
        public_key: impl Into<String>,
        allowed_ips: Vec<String>,
        keepalive_secs: Option<u16>,
    ) -> Result<Self> {
        let public_key = public_key.into();
        validation::validate_public_key(&public_key)?;

        if allowed_ips.is_empty() {
            return Err(ControllerError::Validation(
                "At least one allowed IP is required".to_string(),
            ));
        }
        for allowed_ip in &allowed_ips {
            validation::validate_cidr(allowed_ip)?;
        }

        if let Some(secs) = keepalive_secs {
            validation::validate_keepalive(secs)?;
        }

        Ok(Self {
            public_key,
            allowed_ips,
            keepalive_secs,
        })
    }

    /// Arguments following `wg set <name>` that install this peer
    fn set_args(&self) -> Vec<String> {
        let mut args = vec![
            "peer".to_string(),
            self.public_key.clone(),
            "allowed-ips".to_string(),
            self.allowed_ips.join(","),
        ];

        if let Some(secs) = self.keepalive_secs {
            args.push("persistent-keepalive".to_string());
            args.push(secs.to_string());
        }

        args
    }
}

/// Applies single-peer changes to a running interface
pub struct PeerManager<E> {
    executor: Arc<E>,
    store: ConfigStore,
    locks: Arc<InterfaceLocks>,
}

impl<E: CommandExecutor> PeerManager<E> {
    /// Create a peer manager sharing `locks` with the reconciler
    pub fn new(executor: Arc<E>, store: ConfigStore, locks: Arc<InterfaceLocks>) -> Self {
        Self {
            executor,
            store,
            locks,
        }
    }

    /// Add a peer, or overwrite allowed IPs and keepalive of an existing one
    pub async fn add_peer(&self, name: &InterfaceName, spec: &PeerSpec) -> Result<()> {
        let _guard = self.locks.acquire(name).await;

        let mut args = vec!["set".to_string(), name.to_string()];
        args.extend(spec.set_args());

        let result = self.executor.run(&HostCommand::new("wg", args)).await;
        if !result.succeeded {
            return Err(ControllerError::PeerOperationFailed(format!(
                "Failed to add peer: {}",
                result.diagnostic()
            )));
        }

        self.persist(name).await;
        info!("Peer added to {}: {}", name, spec.public_key);
        Ok(())
    }

    /// Remove a peer; removing an unknown key succeeds
    pub async fn remove_peer(&self, name: &InterfaceName, public_key: &str) -> Result<()> {
        validation::validate_public_key(public_key)?;
        let _guard = self.locks.acquire(name).await;

        let result = self
            .executor
            .run(&HostCommand::new(
                "wg",
                ["set", name.as_str(), "peer", public_key, "remove"],
            ))
            .await;
        if !result.succeeded {
            return Err(ControllerError::PeerOperationFailed(format!(
                "Failed to remove peer: {}",
                result.diagnostic()
            )));
        }

        self.persist(name).await;
        info!("Peer removed from {}: {}", name, public_key);
        Ok(())
    }

    /// Mirror the live peer table to disk; failure only degrades
    async fn persist(&self, name: &InterfaceName) -> bool {
        let path = self.store.config_path(name);
        let result = self
            .executor
            .run(&HostCommand::new(
                "wg-quick",
                ["save".to_string(), path.display().to_string()],
            ))
            .await;

        if !result.succeeded {
            warn!(
                "Degraded: failed to save peer table of {} to {}: {}",
                name,
                path.display(),
                result.diagnostic()
            );
        }
        result.succeeded
    }
}
