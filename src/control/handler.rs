//! Route handlers for the control API
//!
//! Mutating operations run on their own task so that a client hanging up
//! mid-request never interrupts a half-applied ladder or peer change.

use crate::control::api::{
    ApiError, ApplyRequest, ApplyResponse, DownResponse, HealthResponse, ListResponse,
    PeerAddRequest, PeerRemoveRequest, PeerResponse, StatusResponse,
};
use crate::error::{ControllerError, Result};
use crate::executor::CommandExecutor;
use crate::reconcile::Reconciler;
use crate::security::BearerAuth;
use crate::wireguard::{InterfaceConfig, InterfaceName, PeerSpec};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Service name reported by the health check
pub const SERVICE_NAME: &str = "wireguard-controller";

/// Shared state handed to every handler
pub struct AppState<E> {
    /// Reconciler owning the executor, store and lock registry
    pub reconciler: Arc<Reconciler<E>>,
    /// Bearer credential check
    pub auth: BearerAuth,
    /// Keepalive applied when a peer request omits one
    pub default_keepalive_secs: u16,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            reconciler: Arc::clone(&self.reconciler),
            auth: self.auth.clone(),
            default_keepalive_secs: self.default_keepalive_secs,
        }
    }
}

/// Run `operation` to completion on its own task, independent of the caller
async fn run_detached<F, T>(operation: F) -> std::result::Result<T, ApiError>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(operation).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            error!("Operation task failed: {}", e);
            Err(ControllerError::Internal(format!("Operation task failed: {}", e)).into())
        }
    }
}

/// Reject requests without the configured bearer token
pub(crate) async fn require_bearer<E: CommandExecutor>(
    State(state): State<AppState<E>>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = state.auth.verify_header(authorization) {
        warn!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
        return Err(e.into());
    }

    Ok(next.run(request).await)
}

/// `GET /health`
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
    })
}

/// `POST /vpn/apply`
pub(crate) async fn apply<E: CommandExecutor>(
    State(state): State<AppState<E>>,
    payload: std::result::Result<Json<ApplyRequest>, JsonRejection>,
) -> std::result::Result<Json<ApplyResponse>, ApiError> {
    let Json(request) = payload?;
    let name = InterfaceName::new(request.interface)?;
    let config = InterfaceConfig::new(request.config)?;

    info!(
        "Applying configuration to {} ({} peer sections)",
        name,
        config.peer_count()
    );

    let reconciler = Arc::clone(&state.reconciler);
    let target = name.clone();
    let outcome = run_detached(async move { reconciler.reconcile(&target, &config).await }).await;

    let outcome = outcome.map_err(|e| {
        error!("Failed to apply config for {}: {}", name, e.0);
        e
    })?;

    Ok(Json(ApplyResponse {
        status: "success",
        interface: name.to_string(),
        action: outcome.action,
        strategy: outcome.strategy,
        degraded: outcome.degraded,
        output: outcome.status_text,
    }))
}

/// `GET /vpn/status/:interface`
pub(crate) async fn status<E: CommandExecutor>(
    State(state): State<AppState<E>>,
    Path(interface): Path<String>,
) -> std::result::Result<Response, ApiError> {
    let name = InterfaceName::new(interface)?;
    let probe = state.reconciler.probe();

    if !probe.exists(&name).await {
        debug!("Status requested for absent interface {}", name);
        let body = StatusResponse {
            status: "down",
            interface: name.to_string(),
            exists: false,
            wireguard_info: None,
            ip_info: None,
        };
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    }

    let runtime = probe.describe(&name).await;
    Ok(Json(StatusResponse {
        status: "up",
        interface: name.to_string(),
        exists: true,
        wireguard_info: Some(runtime.wireguard_info),
        ip_info: Some(runtime.ip_info),
    })
    .into_response())
}

/// `POST /vpn/down/:interface`
pub(crate) async fn down<E: CommandExecutor>(
    State(state): State<AppState<E>>,
    Path(interface): Path<String>,
) -> std::result::Result<Json<DownResponse>, ApiError> {
    let name = InterfaceName::new(interface)?;

    let reconciler = Arc::clone(&state.reconciler);
    let target = name.clone();
    let result = run_detached(async move {
        Ok::<_, ControllerError>(reconciler.bring_down(&target).await)
    })
    .await?;

    let output = if result.succeeded {
        result.stdout.clone()
    } else {
        result.diagnostic()
    };

    Ok(Json(DownResponse {
        status: "success",
        interface: name.to_string(),
        action: "down",
        succeeded: result.succeeded,
        output,
    }))
}

/// `POST /vpn/peer/add`
pub(crate) async fn add_peer<E: CommandExecutor>(
    State(state): State<AppState<E>>,
    payload: std::result::Result<Json<PeerAddRequest>, JsonRejection>,
) -> std::result::Result<Json<PeerResponse>, ApiError> {
    let Json(request) = payload?;
    let name = InterfaceName::new(request.interface)?;
    // A zero default disables keepalive; an explicit zero is still rejected
    let keepalive = request.persistent_keepalive.or(
        (state.default_keepalive_secs > 0).then_some(state.default_keepalive_secs),
    );
    let spec = PeerSpec::new(request.public_key, request.allowed_ips.into_vec(), keepalive)?;

    let peers = state.reconciler.peer_manager();
    let target = name.clone();
    let peer = spec.clone();
    run_detached(async move { peers.add_peer(&target, &peer).await })
        .await
        .map_err(|e| {
            error!("Failed to add peer to {}: {}", name, e.0);
            e
        })?;

    Ok(Json(PeerResponse {
        status: "success",
        interface: name.to_string(),
        peer: spec.public_key,
        action: "added",
    }))
}

/// `POST /vpn/peer/remove`
pub(crate) async fn remove_peer<E: CommandExecutor>(
    State(state): State<AppState<E>>,
    payload: std::result::Result<Json<PeerRemoveRequest>, JsonRejection>,
) -> std::result::Result<Json<PeerResponse>, ApiError> {
    let Json(request) = payload?;
    let name = InterfaceName::new(request.interface)?;

    let peers = state.reconciler.peer_manager();
    let target = name.clone();
    let public_key = request.public_key.clone();
    run_detached(async move { peers.remove_peer(&target, &public_key).await })
        .await
        .map_err(|e| {
            error!("Failed to remove peer from {}: {}", name, e.0);
            e
        })?;

    Ok(Json(PeerResponse {
        status: "success",
        interface: name.to_string(),
        peer: request.public_key,
        action: "removed",
    }))
}

/// `GET /vpn/list`
pub(crate) async fn list<E: CommandExecutor>(
    State(state): State<AppState<E>>,
) -> Json<ListResponse> {
    let interfaces = state.reconciler.probe().summarize_all().await;

    Json(ListResponse {
        status: "success",
        count: interfaces.len(),
        interfaces,
    })
}
