//! HTTP control server
//!
//! Binds the control API on a TCP listener and serves it until the shutdown
//! future resolves. In-flight operations are allowed to finish.

use crate::config::ControllerConfig;
use crate::control::handler::{self, AppState};
use crate::error::{ControllerError, Result};
use crate::executor::{CommandExecutor, SystemExecutor};
use crate::reconcile::Reconciler;
use crate::security::BearerAuth;
use crate::wireguard::ConfigStore;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Build the control API router.
///
/// Every route except `/health` sits behind the bearer check.
pub fn router<E: CommandExecutor>(state: AppState<E>) -> Router {
    Router::new()
        .route("/vpn/apply", post(handler::apply::<E>))
        .route("/vpn/status/:interface", get(handler::status::<E>))
        .route("/vpn/down/:interface", post(handler::down::<E>))
        .route("/vpn/peer/add", post(handler::add_peer::<E>))
        .route("/vpn/peer/remove", post(handler::remove_peer::<E>))
        .route("/vpn/list", get(handler::list::<E>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handler::require_bearer::<E>,
        ))
        .route("/health", get(handler::health))
        .with_state(state)
}

/// Control server serving the HTTP API
pub struct ControlServer<E> {
    /// Listen address (`host:port`)
    addr: String,
    /// Shared handler state
    state: AppState<E>,
}

impl ControlServer<SystemExecutor> {
    /// Wire a server against the real host from controller settings
    pub fn from_config(config: &ControllerConfig) -> Self {
        let executor = Arc::new(SystemExecutor::new(config.command_timeout()));
        let store = ConfigStore::new(config.storage.config_dir.clone());
        let state = AppState {
            reconciler: Arc::new(Reconciler::new(executor, store)),
            auth: BearerAuth::new(config.auth.api_key.clone()),
            default_keepalive_secs: config.peers.default_keepalive_secs,
        };

        Self::new(config.listen_addr(), state)
    }
}

impl<E: CommandExecutor> ControlServer<E> {
    /// Create a new control server
    pub fn new(addr: String, state: AppState<E>) -> Self {
        Self { addr, state }
    }

    /// Listen address
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| {
                ControllerError::Config(format!("Failed to bind {}: {}", self.addr, e))
            })?;
        info!("Control API listening on {}", self.addr);

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Control API stopped");
        Ok(())
    }
}
