//! Read-only views.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{api_error, ApiError, AppState};
use crate::registry::{ClusterSnapshot, Node};

pub async fn node(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Node>, ApiError> {
    state.manager.node(&name).map(Json).map_err(|e| api_error(&e))
}

pub async fn nodes(State(state): State<AppState>) -> Json<ClusterSnapshot> {
    Json(state.manager.nodes())
}

/// Cluster-wide variables as a JSON document.
pub async fn globals(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.manager.globals().await.to_value())
}
