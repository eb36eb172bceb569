//! HTTP API for the manager.
//!
//! Provides endpoints for:
//! - Node lifecycle requests (commission, decommission, maintenance, discover)
//! - Cluster-wide configuration variables
//! - Read-only views of nodes and globals
//! - Health checks

mod info;
mod nodes;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{ErrorKind, ManagerError};
use crate::manager::Manager;

pub use nodes::{DiscoverRequest, NodeRequest, NodesRequest};

/// Shared application state for the API.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Manager that requests are forwarded to.
    pub manager: Manager,
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Lifecycle
        .route("/commission/node/{name}", post(nodes::commission_node))
        .route("/decommission/node/{name}", post(nodes::decommission_node))
        .route("/maintenance/node/{name}", post(nodes::maintain_node))
        .route("/commission/nodes", post(nodes::commission_nodes))
        .route("/decommission/nodes", post(nodes::decommission_nodes))
        .route("/maintenance/nodes", post(nodes::maintain_nodes))
        .route("/discover/nodes", post(nodes::discover_nodes))
        .route("/globals", post(nodes::set_globals))
        // Views
        .route("/info/node/{name}", get(info::node))
        .route("/info/nodes", get(info::nodes))
        .route("/info/globals", get(info::globals))
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(error: &ManagerError) -> ApiError {
    (
        error_to_status(error),
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

const fn error_to_status(error: &ManagerError) -> StatusCode {
    match error.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::Precondition => StatusCode::PRECONDITION_FAILED,
        ErrorKind::Collaborator => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
