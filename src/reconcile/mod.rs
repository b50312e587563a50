//! Interface reconciliation
//!
//! The [`Reconciler`] converges a named interface onto a desired
//! configuration. It probes the host once, then walks either the create
//! ladder (interface absent) or the reload ladder (interface present):
//!
//! - create: quick-apply, then manual link-create / config-push /
//!   address-assign / link-up
//! - reload: live-sync of the peers-only file, then strip-and-sync, then a
//!   full down/up recycle
//!
//! Cheaper, less disruptive strategies always come first. All operations on
//! one interface name are serialized through [`InterfaceLocks`].

mod ladder;
mod locks;

pub use ladder::{Stage, Strategy};
pub use locks::InterfaceLocks;

use crate::error::{ControllerError, Result};
use crate::executor::{CommandExecutor, CommandResult, HostCommand};
use crate::wireguard::{ConfigStore, InterfaceConfig, InterfaceName, PeerManager, StateProbe};
use ladder::{run_ladder, LadderTarget};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What reconciliation did to the interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileAction {
    /// Interface was absent and has been created
    Created,
    /// Interface existed and its configuration was reloaded
    Reloaded,
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileAction::Created => write!(f, "created"),
            ReconcileAction::Reloaded => write!(f, "reloaded"),
        }
    }
}

/// Successful reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Created or reloaded
    pub action: ReconcileAction,
    /// Strategy that converged the interface
    pub strategy: Strategy,
    /// Live `wg show` output after convergence
    pub status_text: String,
    /// Advisory stages that failed without failing the outcome
    pub degraded: Vec<Stage>,
}

/// Drives interfaces to their desired configuration
pub struct Reconciler<E> {
    executor: Arc<E>,
    store: ConfigStore,
    probe: StateProbe<E>,
    locks: Arc<InterfaceLocks>,
}

impl<E: CommandExecutor> Reconciler<E> {
    /// Create a reconciler with its own lock registry
    pub fn new(executor: Arc<E>, store: ConfigStore) -> Self {
        Self {
            probe: StateProbe::new(Arc::clone(&executor)),
            executor,
            store,
            locks: Arc::new(InterfaceLocks::new()),
        }
    }

    /// Configuration store used for persisting desired state
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Live state probe
    pub fn probe(&self) -> &StateProbe<E> {
        &self.probe
    }

    /// Peer manager sharing this reconciler's executor, store and locks
    pub fn peer_manager(&self) -> PeerManager<E> {
        PeerManager::new(
            Arc::clone(&self.executor),
            self.store.clone(),
            Arc::clone(&self.locks),
        )
    }

    /// Converge `name` onto `config`.
    ///
    /// Holds the interface's lock for the whole run, including the final
    /// status query.
    pub async fn reconcile(
        &self,
        name: &InterfaceName,
        config: &InterfaceConfig,
    ) -> Result<ReconcileOutcome> {
        let _guard = self.locks.acquire(name).await;

        let outcome = if self.probe.exists(name).await {
            info!("Reloading existing interface: {}", name);
            self.reload(name, config).await?
        } else {
            info!("Creating new interface: {}", name);
            self.create(name, config).await?
        };

        info!(
            "Interface {} {} successfully via {}",
            name, outcome.action, outcome.strategy
        );
        Ok(outcome)
    }

    /// Bring the interface down with `wg-quick down`.
    ///
    /// The stored configuration is left in place.
    pub async fn bring_down(&self, name: &InterfaceName) -> CommandResult {
        let _guard = self.locks.acquire(name).await;

        info!("Bringing down interface: {}", name);
        let result = self
            .executor
            .run(&HostCommand::new(
                "wg-quick",
                [
                    "down".to_string(),
                    self.store.config_path(name).display().to_string(),
                ],
            ))
            .await;

        if !result.succeeded {
            warn!("Failed to bring down {}: {}", name, result.diagnostic());
        }
        result
    }

    async fn create(
        &self,
        name: &InterfaceName,
        config: &InterfaceConfig,
    ) -> Result<ReconcileOutcome> {
        let config_path = self.store.write(name, config)?;
        let target = LadderTarget {
            name,
            config,
            config_path,
            peers_path: self.store.peers_path(name),
        };

        let success = run_ladder(&*self.executor, Strategy::CREATE_LADDER, &target)
            .await
            .map_err(|failure| {
                error!(
                    "Failed to create {}: {} failed at {}: {}",
                    name, failure.strategy, failure.stage, failure.diagnostic
                );
                ControllerError::CreateFailed {
                    stage: failure.stage,
                    diagnostic: failure.diagnostic,
                }
            })?;

        let mut degraded = success.degraded;

        // Link state may lag behind the tools; verification is advisory
        if self.probe.exists(name).await {
            info!("Interface {} verified on host", name);
        } else {
            error!("Interface {} not found after creation", name);
            degraded.push(Stage::Verify);
        }

        Ok(ReconcileOutcome {
            action: ReconcileAction::Created,
            strategy: success.strategy,
            status_text: self.probe.wireguard_info(name).await,
            degraded,
        })
    }

    async fn reload(
        &self,
        name: &InterfaceName,
        config: &InterfaceConfig,
    ) -> Result<ReconcileOutcome> {
        let config_path = self.store.write(name, config)?;
        // syncconf only accepts peer sections
        let peers_path = self.store.write_peers_only(name, config)?;
        let target = LadderTarget {
            name,
            config,
            config_path,
            peers_path,
        };

        let success = run_ladder(&*self.executor, Strategy::RELOAD_LADDER, &target)
            .await
            .map_err(|failure| {
                error!(
                    "Failed to reload {}: {} failed at {}: {}",
                    name, failure.strategy, failure.stage, failure.diagnostic
                );
                ControllerError::ReloadFailed {
                    stage: failure.stage,
                    diagnostic: failure.diagnostic,
                }
            })?;

        Ok(ReconcileOutcome {
            action: ReconcileAction::Reloaded,
            strategy: success.strategy,
            status_text: self.probe.wireguard_info(name).await,
            degraded: success.degraded,
        })
    }
}
