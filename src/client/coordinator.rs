//! Quorum coordinator.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::connections::ConnectionRegistry;
use super::error::ClientError;
use crate::ring::{Node, Ring};

/// Coordinator tuning.
///
/// `replication_factor` is the placement width for writes; `write_quorum`
/// is the success threshold within it. They default to the same value.
/// `hedge_timeout` is the per-replica read deadline and, halved, the delay
/// before a hedged sibling attempt; zero disables hedging entirely.
/// `hedge_ratio` caps the fraction of reads that arm hedging.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub replication_factor: usize,
    pub read_quorum: usize,
    pub write_quorum: usize,
    pub request_timeout: Duration,
    pub hedge_timeout: Duration,
    pub hedge_ratio: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            replication_factor: 2,
            read_quorum: 2,
            write_quorum: 2,
            request_timeout: Duration::from_secs(5),
            hedge_timeout: Duration::from_millis(100),
            hedge_ratio: 0.1,
        }
    }
}

/// Snapshot of the coordinator's configuration and membership view.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStats {
    pub nodes: usize,
    pub connections: usize,
    pub read_quorum: usize,
    pub write_quorum: usize,
    pub hedge_timeout_ms: u64,
    pub hedge_ratio: f64,
}

/// Client-side coordinator for the cache cluster.
///
/// Owns its own placement ring and connection registry; membership is
/// supplied externally through `add_node`/`remove_node`.
pub struct CacheClient {
    ring: Ring,
    registry: ConnectionRegistry,
    config: ClientConfig,
}

impl CacheClient {
    pub fn new(config: ClientConfig) -> Self {
        CacheClient {
            ring: Ring::new(),
            registry: ConnectionRegistry::new(),
            config,
        }
    }

    /// Adds a node to the ring and opens its durable connection.
    pub fn add_node(&self, id: &str, addr: &str) -> Result<(), ClientError> {
        self.registry.add(id, addr)?;
        self.ring.add_node(id, addr);
        info!(id, addr, "added node");
        Ok(())
    }

    /// Removes a node from the ring and closes its connection.
    pub fn remove_node(&self, id: &str) {
        self.ring.remove_node(id);
        self.registry.remove(id);
        info!(id, "removed node");
    }

    /// Reads `key`, walking the ordered replicas until one gives a
    /// definitive answer. `Ok(None)` means the key definitively does not
    /// exist; transport and deadline failures advance to the next replica.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ClientError> {
        let replicas = self.ring.owners(key, self.config.read_quorum);
        if replicas.is_empty() {
            return Err(ClientError::NoNodesAvailable);
        }

        for replica in &replicas {
            match self.read_replica(replica, key).await {
                Ok(answer) => return Ok(answer),
                Err(err) => {
                    debug!(node = %replica.id, %err, "read attempt failed, trying next replica");
                }
            }
        }

        Err(ClientError::ReplicasExhausted(replicas.len()))
    }

    /// Writes `key` to every replica in the placement set and returns once
    /// the write quorum acknowledges. Never hedged: each replica receives
    /// exactly one attempt, since duplicate writes could reorder with
    /// concurrent writes under last-writer-wins.
    pub async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), ClientError> {
        let replicas = self.write_placement(key)?;
        let required = self.config.write_quorum;
        let ttl_ms = ttl.map(|ttl| ttl.as_millis() as u64);
        let timeout = self.config.request_timeout;

        let (outcome_tx, mut outcome_rx) = mpsc::channel(replicas.len());
        for replica in &replicas {
            let conn = self.registry.get(&replica.id);
            let outcome_tx = outcome_tx.clone();
            let key = key.to_owned();
            let value = value.clone();
            let node = replica.id.clone();

            // Detached: stragglers must finish their replica write even
            // after the quorum is already met.
            tokio::spawn(async move {
                let result = match conn {
                    Ok(conn) => conn.set_value(&key, value, ttl_ms, timeout).await,
                    Err(err) => Err(err),
                };
                if let Err(err) = &result {
                    warn!(%node, %err, "replica set failed");
                }
                let _ = outcome_tx.send(result.is_ok()).await;
            });
        }
        drop(outcome_tx);

        self.await_quorum(&mut outcome_rx, required).await
    }

    /// Deletes `key` on every replica in the placement set. A replica
    /// reporting "did not exist" counts toward the quorum: deletion is
    /// idempotent.
    pub async fn delete(&self, key: &str) -> Result<(), ClientError> {
        let replicas = self.write_placement(key)?;
        let required = self.config.write_quorum;
        let timeout = self.config.request_timeout;

        let (outcome_tx, mut outcome_rx) = mpsc::channel(replicas.len());
        for replica in &replicas {
            let conn = self.registry.get(&replica.id);
            let outcome_tx = outcome_tx.clone();
            let key = key.to_owned();
            let node = replica.id.clone();

            tokio::spawn(async move {
                let result = match conn {
                    Ok(conn) => conn.delete_value(&key, timeout).await.map(|_| ()),
                    Err(err) => Err(err),
                };
                if let Err(err) = &result {
                    warn!(%node, %err, "replica delete failed");
                }
                let _ = outcome_tx.send(result.is_ok()).await;
            });
        }
        drop(outcome_tx);

        self.await_quorum(&mut outcome_rx, required).await
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            nodes: self.ring.node_count(),
            connections: self.registry.len(),
            read_quorum: self.config.read_quorum,
            write_quorum: self.config.write_quorum,
            hedge_timeout_ms: self.config.hedge_timeout.as_millis() as u64,
            hedge_ratio: self.config.hedge_ratio,
        }
    }

    fn write_placement(&self, key: &str) -> Result<Vec<Node>, ClientError> {
        let width = self
            .config
            .replication_factor
            .max(self.config.write_quorum);
        let replicas = self.ring.owners(key, width);
        if replicas.is_empty() {
            return Err(ClientError::NoNodesAvailable);
        }
        Ok(replicas)
    }

    /// Drains write outcomes until the quorum is met or every replica has
    /// reported.
    async fn await_quorum(
        &self,
        outcomes: &mut mpsc::Receiver<bool>,
        required: usize,
    ) -> Result<(), ClientError> {
        let mut successes = 0;
        while let Some(ok) = outcomes.recv().await {
            if ok {
                successes += 1;
                if successes >= required {
                    return Ok(());
                }
            }
        }

        Err(ClientError::QuorumFailed {
            successes,
            required,
        })
    }

    /// One replica attempt for a read, with optional hedging.
    ///
    /// When armed, a sibling request to the same replica starts after half
    /// the hedge deadline and races the primary one; the first definitive
    /// answer wins. Both attempts share the per-replica deadline, and the
    /// loser is aborted when this call returns, so nothing stays
    /// outstanding past the deadline.
    async fn read_replica(
        &self,
        replica: &Node,
        key: &str,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        let conn = self.registry.get(&replica.id)?;
        let hedge_timeout = self.config.hedge_timeout;

        if hedge_timeout.is_zero() || !self.hedge_armed() {
            return conn.get_value(key, self.config.request_timeout).await;
        }

        let mut attempts = JoinSet::new();
        for delay in [Duration::ZERO, hedge_timeout / 2] {
            let conn = conn.clone();
            let key = key.to_owned();
            attempts.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                conn.get_value(&key, hedge_timeout).await
            });
        }

        let race = tokio::time::timeout(hedge_timeout, async {
            let mut last = ClientError::DeadlineExceeded;
            while let Some(joined) = attempts.join_next().await {
                match joined {
                    Ok(Ok(answer)) => return Ok(answer),
                    Ok(Err(err)) => last = err,
                    Err(join_err) => {
                        debug!(%join_err, "hedged attempt aborted");
                    }
                }
            }
            Err(last)
        })
        .await;

        match race {
            Ok(result) => result,
            Err(_) => Err(ClientError::DeadlineExceeded),
        }
    }

    fn hedge_armed(&self) -> bool {
        self.config.hedge_ratio > 0.0 && rand::random::<f64>() < self.config.hedge_ratio
    }
}
