//! RPC Protocol
//!
//! Endpoint paths and Data Transfer Objects for the node's RPC surface.
//! The structures are serialized as JSON and exchanged over HTTP; both the
//! node service and the client coordinator consume these types.

use serde::{Deserialize, Serialize};

// --- Endpoints ---

/// Single-replica point read.
pub const ENDPOINT_GET: &str = "/rpc/get";
/// Single-replica write.
pub const ENDPOINT_SET: &str = "/rpc/set";
/// Single-replica removal.
pub const ENDPOINT_DELETE: &str = "/rpc/delete";
/// Liveness probe on the RPC surface.
pub const ENDPOINT_HEALTH: &str = "/rpc/health";

// --- Bounds ---

/// Longest accepted key, in bytes.
pub const MAX_KEY_BYTES: usize = 256;
/// Largest accepted value payload, in bytes.
pub const MAX_VALUE_BYTES: usize = 1024 * 1024;

// --- Data Transfer Objects ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    /// The stored payload; `None` when the key is absent or expired.
    pub value: Option<Vec<u8>>,
    pub found: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Vec<u8>,
    /// Time to live in milliseconds. Absent or zero means no expiry.
    pub ttl_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: String,
}
