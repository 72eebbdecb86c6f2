//! RPC and sidecar handlers.
//!
//! The RPC router is the node's single-replica endpoint; admission runs as
//! a middleware layer around every RPC, holding the concurrency permit
//! until the handler returns. The sidecar router exposes the operational
//! health/metrics surface on its own port and bypasses admission.

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::admission::{AdmissionController, AdmissionError};
use super::error::ServiceError;
use super::protocol::{
    DeleteRequest, DeleteResponse, GetRequest, GetResponse, HealthResponse, SetRequest,
    SetResponse, ENDPOINT_DELETE, ENDPOINT_GET, ENDPOINT_HEALTH, ENDPOINT_SET, MAX_KEY_BYTES,
    MAX_VALUE_BYTES,
};
use crate::cache::Cache;

/// Shared state behind every handler on both routers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Cache>,
    pub admission: Arc<AdmissionController>,
}

impl AppState {
    pub fn new(cache: Arc<Cache>, admission: Arc<AdmissionController>) -> Self {
        AppState { cache, admission }
    }
}

/// Builds the RPC router with the admission layer applied to every method.
pub fn rpc_router(state: AppState) -> Router {
    Router::new()
        .route(ENDPOINT_GET, post(handle_get))
        .route(ENDPOINT_SET, post(handle_set))
        .route(ENDPOINT_DELETE, post(handle_delete))
        .route(ENDPOINT_HEALTH, post(handle_health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_layer,
        ))
        .with_state(state)
}

/// Builds the sidecar health/metrics router.
pub fn sidecar_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_sidecar_health))
        .route("/metrics", get(handle_metrics))
        .with_state(state)
}

/// The analog of a unary interceptor: sheds before the handler runs and
/// keeps the permit alive across it.
async fn admission_layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let _permit = match state.admission.admit() {
        Ok(permit) => permit,
        Err(AdmissionError::Overloaded) => return ServiceError::Overloaded.into_response(),
        Err(AdmissionError::Saturated) => return ServiceError::Saturated.into_response(),
    };

    next.run(req).await
}

fn validate_key(key: &str) -> Result<(), ServiceError> {
    if key.is_empty() {
        return Err(ServiceError::InvalidRequest("empty key".to_owned()));
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(ServiceError::InvalidRequest(format!(
            "key exceeds {MAX_KEY_BYTES} bytes"
        )));
    }
    Ok(())
}

async fn handle_get(
    State(state): State<AppState>,
    Json(req): Json<GetRequest>,
) -> Result<Json<GetResponse>, ServiceError> {
    validate_key(&req.key)?;

    let value = state.cache.get(&req.key);
    Ok(Json(GetResponse {
        found: value.is_some(),
        value,
    }))
}

async fn handle_set(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>, ServiceError> {
    validate_key(&req.key)?;
    if req.value.len() > MAX_VALUE_BYTES {
        return Err(ServiceError::InvalidRequest(format!(
            "value exceeds {MAX_VALUE_BYTES} bytes"
        )));
    }

    let ttl = req.ttl_ms.map(Duration::from_millis);
    state.cache.set(&req.key, req.value, ttl);

    Ok(Json(SetResponse { success: true }))
}

async fn handle_delete(
    State(state): State<AppState>,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ServiceError> {
    validate_key(&req.key)?;

    Ok(Json(DeleteResponse {
        deleted: state.cache.delete(&req.key),
    }))
}

async fn handle_health(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        status: "healthy".to_owned(),
    })
}

async fn handle_sidecar_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[derive(Serialize)]
struct MetricsResponse {
    cache_size: usize,
    cache_capacity: usize,
    cache_load: f64,
    concurrent_requests: usize,
    max_concurrent: usize,
    workers: usize,
}

async fn handle_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let stats = state.cache.stats();

    Json(MetricsResponse {
        cache_size: stats.size,
        cache_capacity: stats.capacity,
        cache_load: stats.load,
        concurrent_requests: state.admission.in_flight(),
        max_concurrent: state.admission.max_concurrent(),
        workers: tokio::runtime::Handle::current().metrics().num_workers(),
    })
}
