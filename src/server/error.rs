//! RPC error surface for the node service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures a single-replica RPC can report to its caller.
///
/// Both shedding outcomes map to 503 so the coordinator treats them as
/// transient, with distinct messages so operators can tell the overload
/// gate from the concurrency gate apart.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed request (key or value outside the accepted bounds).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The rolling-window load signal exceeded the configured threshold.
    #[error("server overloaded")]
    Overloaded,

    /// No concurrency permit was available; the request was not queued.
    #[error("too many concurrent requests")]
    Saturated,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Overloaded | ServiceError::Saturated => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
