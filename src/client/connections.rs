//! Durable per-node transport handles.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use super::error::ClientError;
use crate::server::protocol::{
    DeleteRequest, DeleteResponse, GetRequest, GetResponse, HealthResponse, SetRequest,
    SetResponse, ENDPOINT_DELETE, ENDPOINT_GET, ENDPOINT_HEALTH, ENDPOINT_SET,
};

/// One durable transport handle to a single node.
///
/// The underlying HTTP client pools its connections, so the handle stays
/// cheap to clone and safe to share across fan-out tasks.
pub struct NodeConnection {
    pub id: String,
    pub addr: String,
    http: reqwest::Client,
}

impl NodeConnection {
    fn open(id: &str, addr: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|source| ClientError::Transport {
                node: id.to_owned(),
                source,
            })?;

        Ok(NodeConnection {
            id: id.to_owned(),
            addr: addr.to_owned(),
            http,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("http://{}{}", self.addr, endpoint)
    }

    fn transport_error(&self, source: reqwest::Error) -> ClientError {
        if source.is_timeout() {
            ClientError::DeadlineExceeded
        } else {
            ClientError::Transport {
                node: self.id.clone(),
                source,
            }
        }
    }

    /// Single-replica GET. `Ok(None)` is a definitive not-found.
    pub async fn get_value(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        let response = self
            .http
            .post(self.url(ENDPOINT_GET))
            .json(&GetRequest { key: key.to_owned() })
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(ClientError::Rejected {
                node: self.id.clone(),
                status: response.status().as_u16(),
            });
        }

        let body: GetResponse = response.json().await.map_err(|e| self.transport_error(e))?;
        if body.found {
            Ok(Some(body.value.unwrap_or_default()))
        } else {
            Ok(None)
        }
    }

    /// Single-replica SET.
    pub async fn set_value(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_ms: Option<u64>,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(ENDPOINT_SET))
            .json(&SetRequest {
                key: key.to_owned(),
                value,
                ttl_ms,
            })
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(ClientError::Rejected {
                node: self.id.clone(),
                status: response.status().as_u16(),
            });
        }

        let body: SetResponse = response.json().await.map_err(|e| self.transport_error(e))?;
        if body.success {
            Ok(())
        } else {
            Err(ClientError::Rejected {
                node: self.id.clone(),
                status: 200,
            })
        }
    }

    /// Single-replica DELETE. Returns whether the key existed there.
    pub async fn delete_value(&self, key: &str, timeout: Duration) -> Result<bool, ClientError> {
        let response = self
            .http
            .post(self.url(ENDPOINT_DELETE))
            .json(&DeleteRequest { key: key.to_owned() })
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(ClientError::Rejected {
                node: self.id.clone(),
                status: response.status().as_u16(),
            });
        }

        let body: DeleteResponse = response.json().await.map_err(|e| self.transport_error(e))?;
        Ok(body.deleted)
    }

    /// Probes the node's RPC surface.
    pub async fn health(&self, timeout: Duration) -> Result<HealthResponse, ClientError> {
        let response = self
            .http
            .post(self.url(ENDPOINT_HEALTH))
            .json(&serde_json::json!({}))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(ClientError::Rejected {
                node: self.id.clone(),
                status: response.status().as_u16(),
            });
        }

        response.json().await.map_err(|e| self.transport_error(e))
    }
}

/// One durable handle per node identity, consulted on every RPC.
///
/// The registry never retries or reconnects on its own; a missing handle is
/// reported and left for the next `add` to repair.
pub struct ConnectionRegistry {
    conns: DashMap<String, Arc<NodeConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        ConnectionRegistry {
            conns: DashMap::new(),
        }
    }

    /// Opens a handle to `addr` and installs it under `id`, replacing any
    /// previous handle.
    pub fn add(&self, id: &str, addr: &str) -> Result<(), ClientError> {
        let conn = NodeConnection::open(id, addr)?;
        self.conns.insert(id.to_owned(), Arc::new(conn));
        Ok(())
    }

    /// Closes and removes the handle for `id`; closing is idempotent.
    pub fn remove(&self, id: &str) {
        self.conns.remove(id);
    }

    pub fn get(&self, id: &str) -> Result<Arc<NodeConnection>, ClientError> {
        self.conns
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ClientError::NoConnection(id.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
