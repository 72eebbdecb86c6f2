use super::admission::{AdmissionController, AdmissionError};
use super::protocol::{
    ENDPOINT_DELETE, ENDPOINT_GET, ENDPOINT_HEALTH, ENDPOINT_SET, MAX_KEY_BYTES, MAX_VALUE_BYTES,
};
use super::service::{rpc_router, sidecar_router, AppState};
use crate::cache::Cache;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn controller(max_concurrent: usize, threshold: f64) -> Arc<AdmissionController> {
    Arc::new(AdmissionController::new(
        max_concurrent,
        threshold,
        Duration::from_secs(10),
    ))
}

fn test_state(admission: Arc<AdmissionController>) -> AppState {
    AppState::new(Arc::new(Cache::new(100)), admission)
}

async fn rpc(app: Router, endpoint: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(endpoint)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// --- Admission gates ---

#[test]
fn test_empty_window_admits() {
    let admission = controller(4, 0.5);
    assert!(admission.admit().is_ok());
}

#[test]
fn test_overload_gate_closes_above_threshold() {
    let admission = controller(4, 0.5);
    for _ in 0..3 {
        admission.record_sample(0.9);
    }
    assert_eq!(admission.admit().err(), Some(AdmissionError::Overloaded));
}

#[test]
fn test_overload_gate_is_strict() {
    // Mean exactly at the threshold keeps the gate open
    let admission = controller(4, 0.5);
    for _ in 0..4 {
        admission.record_sample(0.5);
    }
    assert!(admission.admit().is_ok());
}

#[test]
fn test_overload_window_trims_old_samples() {
    let admission = Arc::new(AdmissionController::new(4, 0.5, Duration::from_secs(2)));
    admission.record_sample(1.0);
    admission.record_sample(0.0);
    admission.record_sample(0.0);

    // The 1.0 sample fell out of the two-second window
    assert!(admission.admit().is_ok());
}

#[test]
fn test_concurrency_gate_rejects_without_queueing() {
    let admission = controller(1, 0.9);

    let held = admission.admit().unwrap();
    assert_eq!(admission.in_flight(), 1);
    assert_eq!(admission.admit().err(), Some(AdmissionError::Saturated));

    drop(held);
    assert_eq!(admission.in_flight(), 0);
    assert!(admission.admit().is_ok());
}

#[test]
fn test_overload_rejection_takes_no_permit() {
    let admission = controller(1, 0.5);
    admission.record_sample(1.0);

    assert_eq!(admission.admit().err(), Some(AdmissionError::Overloaded));
    assert_eq!(admission.in_flight(), 0);
}

// --- RPC handlers ---

#[tokio::test]
async fn test_rpc_roundtrip() {
    let app = rpc_router(test_state(controller(16, 0.9)));

    let (status, body) = rpc(
        app.clone(),
        ENDPOINT_SET,
        json!({ "key": "test-key", "value": b"test-value".to_vec() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = rpc(app.clone(), ENDPOINT_GET, json!({ "key": "test-key" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["value"], json!(b"test-value".to_vec()));

    let (status, body) = rpc(app.clone(), ENDPOINT_DELETE, json!({ "key": "test-key" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (_, body) = rpc(app, ENDPOINT_GET, json!({ "key": "test-key" })).await;
    assert_eq!(body["found"], false);
}

#[tokio::test]
async fn test_rpc_get_missing_key() {
    let app = rpc_router(test_state(controller(16, 0.9)));

    let (status, body) = rpc(app, ENDPOINT_GET, json!({ "key": "absent" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], false);
    assert_eq!(body["value"], Value::Null);
}

#[tokio::test]
async fn test_rpc_delete_missing_key() {
    let app = rpc_router(test_state(controller(16, 0.9)));

    let (status, body) = rpc(app, ENDPOINT_DELETE, json!({ "key": "absent" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], false);
}

#[tokio::test]
async fn test_rpc_health() {
    let app = rpc_router(test_state(controller(16, 0.9)));

    let (status, body) = rpc(app, ENDPOINT_HEALTH, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_rpc_rejects_oversized_key() {
    let app = rpc_router(test_state(controller(16, 0.9)));

    let long_key = "x".repeat(MAX_KEY_BYTES + 1);
    let (status, body) = rpc(
        app,
        ENDPOINT_SET,
        json!({ "key": long_key, "value": b"v".to_vec() }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("key"));
}

#[tokio::test]
async fn test_rpc_rejects_oversized_value() {
    let app = rpc_router(test_state(controller(16, 0.9)));

    let big_value = vec![0u8; MAX_VALUE_BYTES + 1];
    let (status, _) = rpc(app, ENDPOINT_SET, json!({ "key": "k", "value": big_value })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rpc_shed_when_overloaded() {
    let admission = controller(16, 0.5);
    admission.record_sample(1.0);
    let app = rpc_router(test_state(admission));

    let (status, body) = rpc(app, ENDPOINT_GET, json!({ "key": "k" })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "server overloaded");
}

#[tokio::test]
async fn test_rpc_shed_when_saturated() {
    let admission = controller(1, 0.9);
    let held = admission.admit().unwrap();
    let app = rpc_router(test_state(admission));

    let (status, body) = rpc(app, ENDPOINT_GET, json!({ "key": "k" })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "too many concurrent requests");

    drop(held);
}

// --- Sidecar surface ---

#[tokio::test]
async fn test_sidecar_health() {
    let app = sidecar_router(test_state(controller(16, 0.9)));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_sidecar_metrics() {
    let state = test_state(controller(16, 0.9));
    state.cache.set("k", b"v".to_vec(), None);
    let app = sidecar_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["cache_size"], 1);
    assert_eq!(body["cache_capacity"], 100);
    assert_eq!(body["concurrent_requests"], 0);
    assert_eq!(body["max_concurrent"], 16);
    assert!(body["workers"].as_u64().unwrap() >= 1);
}
