//! Control API for the provisioning backend
//!
//! JSON over HTTP, authenticated with a shared bearer token. Each route maps
//! onto one reconciler, peer manager or probe operation.

mod api;
mod handler;
mod server;

pub use api::{
    AllowedIps, ApiError, ApplyRequest, ApplyResponse, DownResponse, ErrorBody, HealthResponse,
    ListResponse, PeerAddRequest, PeerRemoveRequest, PeerResponse, StatusResponse,
};
pub use handler::{AppState, SERVICE_NAME};
pub use server::{router, ControlServer};
