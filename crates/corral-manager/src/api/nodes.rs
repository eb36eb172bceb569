//! Lifecycle endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{api_error, ApiError, AppState};

/// Body of a single-node request.
#[derive(Debug, Default, Deserialize)]
pub struct NodeRequest {
    /// Extra variables as JSON text. Empty means none.
    #[serde(default)]
    pub extra_vars: String,
}

/// Body of a multi-node request.
#[derive(Debug, Default, Deserialize)]
pub struct NodesRequest {
    /// Node names, processed in order.
    pub nodes: Vec<String>,
    #[serde(default)]
    pub extra_vars: String,
}

/// Body of a discover request.
#[derive(Debug, Default, Deserialize)]
pub struct DiscoverRequest {
    /// Management addresses of the hosts to bootstrap.
    pub addrs: Vec<String>,
    #[serde(default)]
    pub extra_vars: String,
}

/// Response for an accepted request.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
}

type Accepted = Result<(StatusCode, Json<AcceptedResponse>), ApiError>;

fn accepted(result: crate::error::ManagerResult<()>, status: StatusCode) -> Accepted {
    match result {
        Ok(()) => Ok((status, Json(AcceptedResponse { status: "ok" }))),
        Err(e) => Err(api_error(&e)),
    }
}

/// Commission a node.
pub async fn commission_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<NodeRequest>,
) -> Accepted {
    info!(node = %name, "commission requested via API");
    let result = state
        .manager
        .commission_node(&name, &request.extra_vars)
        .await;
    accepted(result, StatusCode::ACCEPTED)
}

/// Decommission a node.
pub async fn decommission_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<NodeRequest>,
) -> Accepted {
    info!(node = %name, "decommission requested via API");
    let result = state
        .manager
        .decommission_node(&name, &request.extra_vars)
        .await;
    accepted(result, StatusCode::ACCEPTED)
}

/// Put a node into maintenance.
pub async fn maintain_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<NodeRequest>,
) -> Accepted {
    info!(node = %name, "maintenance requested via API");
    let result = state.manager.maintain_node(&name, &request.extra_vars).await;
    accepted(result, StatusCode::ACCEPTED)
}

pub async fn commission_nodes(
    State(state): State<AppState>,
    Json(request): Json<NodesRequest>,
) -> Accepted {
    info!(nodes = ?request.nodes, "commission requested via API");
    let result = state
        .manager
        .commission_nodes(&request.nodes, &request.extra_vars)
        .await;
    accepted(result, StatusCode::ACCEPTED)
}

pub async fn decommission_nodes(
    State(state): State<AppState>,
    Json(request): Json<NodesRequest>,
) -> Accepted {
    info!(nodes = ?request.nodes, "decommission requested via API");
    let result = state
        .manager
        .decommission_nodes(&request.nodes, &request.extra_vars)
        .await;
    accepted(result, StatusCode::ACCEPTED)
}

pub async fn maintain_nodes(
    State(state): State<AppState>,
    Json(request): Json<NodesRequest>,
) -> Accepted {
    info!(nodes = ?request.nodes, "maintenance requested via API");
    let result = state
        .manager
        .maintain_nodes(&request.nodes, &request.extra_vars)
        .await;
    accepted(result, StatusCode::ACCEPTED)
}

/// Bootstrap hosts by management address.
pub async fn discover_nodes(
    State(state): State<AppState>,
    Json(request): Json<DiscoverRequest>,
) -> Accepted {
    info!(addrs = ?request.addrs, "discover requested via API");
    let result = state
        .manager
        .discover_nodes(&request.addrs, &request.extra_vars)
        .await;
    accepted(result, StatusCode::OK)
}

/// Replace the cluster-wide variables.
pub async fn set_globals(
    State(state): State<AppState>,
    Json(request): Json<NodeRequest>,
) -> Accepted {
    let result = state.manager.set_globals(&request.extra_vars).await;
    accepted(result, StatusCode::OK)
}
