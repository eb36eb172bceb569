//! Integration tests for the HTTP API against a running processor.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::TestManager;
use corral_inventory::AssetStatus;
use corral_manager::configuration::ConfigOp;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(
    t: &TestManager,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = t.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let t = TestManager::new();
    let name = t.discover("host", "10.0.0.1").await;

    let (status, _) = call(
        &t,
        "POST",
        &format!("/commission/node/{name}"),
        Some(json!({ "extra_vars": "{\"env\":\"lab\"}" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    t.settle().await;

    let (status, body) = call(&t, "GET", &format!("/info/node/{name}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inventory-state"]["status"], "Commissioned");
    assert_eq!(body["inventory-state"]["prev-status"], "Provisioning");

    let uri = format!("/maintenance/node/{name}");
    let (status, _) = call(&t, "POST", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    t.settle().await;
    assert_eq!(t.configuration.calls_for(ConfigOp::Upgrade).len(), 1);

    let (status, _) = call(
        &t,
        "POST",
        "/decommission/nodes",
        Some(json!({ "nodes": [&name] })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    t.settle().await;
    assert_eq!(t.asset(&name).await.status(), AssetStatus::Decommissioned);
}

#[tokio::test]
async fn blocked_master_decommission_is_precondition_failed() {
    let t = TestManager::new();
    let master = t.commissioned("alpha", "10.0.0.1").await;
    t.commissioned("beta", "10.0.0.2").await;

    let (status, body) = call(
        &t,
        "POST",
        &format!("/decommission/node/{master}"),
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("is a master node"));
}

#[tokio::test]
async fn maintenance_of_many_stops_at_first_failure() {
    let t = TestManager::new();
    let a = t.commissioned("alpha", "10.0.0.1").await;
    let b = t.discover("beta", "10.0.0.2").await;
    let c = t.commissioned("gamma", "10.0.0.3").await;

    let (status, _) = call(
        &t,
        "POST",
        "/maintenance/nodes",
        Some(json!({ "nodes": [&a, &b, &c] })),
    )
    .await;
    t.settle().await;

    // beta is only unallocated, so it cannot enter maintenance
    assert_eq!(status, StatusCode::CONFLICT);
    let upgraded: Vec<_> = t
        .configuration
        .calls_for(ConfigOp::Upgrade)
        .into_iter()
        .map(|call| call.hosts[0].tag().to_owned())
        .collect();
    assert_eq!(upgraded, vec![a]);
    assert_eq!(t.asset(&c).await.status(), AssetStatus::Commissioned);
}

#[tokio::test]
async fn globals_round_trip_over_http() {
    let t = TestManager::new();

    let (status, _) = call(
        &t,
        "POST",
        "/globals",
        Some(json!({ "extra_vars": "{\"proxy\":\"http://proxy:3128\"}" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&t, "GET", "/info/globals", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "proxy": "http://proxy:3128" }));
}

#[tokio::test]
async fn nodes_view_lists_every_node() {
    let t = TestManager::new();
    t.discover("alpha", "10.0.0.1").await;
    t.discover("beta", "10.0.0.2").await;

    let (status, body) = call(&t, "GET", "/info/nodes", None).await;

    assert_eq!(status, StatusCode::OK);
    let nodes = body.as_object().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(
        nodes["beta-1"]["monitoring-state"]["management-address"],
        "10.0.0.2"
    );
}
