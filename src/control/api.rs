//! Control API request and response types
//!
//! JSON bodies exchanged with the provisioning backend, plus the mapping of
//! [`ControllerError`] onto HTTP status codes.

use crate::error::ControllerError;
use crate::reconcile::{ReconcileAction, Stage, Strategy};
use crate::wireguard::InterfaceSummary;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Body of `POST /vpn/apply`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
    /// Interface name
    pub interface: String,
    /// Full configuration text
    pub config: String,
}

/// Allowed IPs as either a JSON list or one comma-separated string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowedIps {
    /// `["10.0.0.2/32", "fd00::2/128"]`
    List(Vec<String>),
    /// `"10.0.0.2/32,fd00::2/128"`
    Joined(String),
}

impl AllowedIps {
    /// Individual ranges, trimmed, empty entries dropped
    pub fn into_vec(self) -> Vec<String> {
        let ranges = match self {
            AllowedIps::List(list) => list,
            AllowedIps::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        ranges
            .into_iter()
            .map(|range| range.trim().to_string())
            .filter(|range| !range.is_empty())
            .collect()
    }
}

/// Body of `POST /vpn/peer/add`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerAddRequest {
    /// Interface name
    pub interface: String,
    /// Base64 public key of the peer
    pub public_key: String,
    /// Ranges routed to the peer
    pub allowed_ips: AllowedIps,
    /// Falls back to the configured default when absent
    #[serde(default)]
    pub persistent_keepalive: Option<u16>,
}

/// Body of `POST /vpn/peer/remove`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRemoveRequest {
    /// Interface name
    pub interface: String,
    /// Base64 public key of the peer
    pub public_key: String,
}

/// `GET /health`
#[derive(Debug, Clone, Serialize)]
#[allow(missing_docs)]
pub struct HealthResponse {
    pub status: &'static str,
    /// RFC 3339 timestamp of the check
    pub timestamp: String,
    pub service: &'static str,
}

/// Successful `POST /vpn/apply`
#[derive(Debug, Clone, Serialize)]
#[allow(missing_docs)]
pub struct ApplyResponse {
    pub status: &'static str,
    pub interface: String,
    pub action: ReconcileAction,
    pub strategy: Strategy,
    /// Advisory stages that failed along the way
    pub degraded: Vec<Stage>,
    /// Live `wg show` output
    pub output: String,
}

/// `GET /vpn/status/:interface`
#[derive(Debug, Clone, Serialize)]
#[allow(missing_docs)]
pub struct StatusResponse {
    pub status: &'static str,
    pub interface: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wireguard_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_info: Option<String>,
}

/// `POST /vpn/down/:interface`
#[derive(Debug, Clone, Serialize)]
#[allow(missing_docs)]
pub struct DownResponse {
    pub status: &'static str,
    pub interface: String,
    pub action: &'static str,
    /// Whether `wg-quick down` exited zero
    pub succeeded: bool,
    pub output: String,
}

/// `POST /vpn/peer/add` and `POST /vpn/peer/remove`
#[derive(Debug, Clone, Serialize)]
#[allow(missing_docs)]
pub struct PeerResponse {
    pub status: &'static str,
    pub interface: String,
    pub peer: String,
    /// `added` or `removed`
    pub action: &'static str,
}

/// `GET /vpn/list`
#[derive(Debug, Clone, Serialize)]
#[allow(missing_docs)]
pub struct ListResponse {
    pub status: &'static str,
    pub count: usize,
    pub interfaces: Vec<InterfaceSummary>,
}

/// Error body returned with every non-2xx status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure description
    pub error: String,
}

/// Controller error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub ControllerError);

impl ApiError {
    /// HTTP status for the wrapped error
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            ControllerError::Validation(_) => StatusCode::BAD_REQUEST,
            ControllerError::Auth(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ControllerError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorBody {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}
