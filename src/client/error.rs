//! Coordinator failure taxonomy.

use thiserror::Error;

/// Failures surfaced by the quorum coordinator.
///
/// A definitive not-found on GET is not an error; it is returned as
/// `Ok(None)`.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The ring has no members to place the key on; no fan-out happened.
    #[error("no nodes available")]
    NoNodesAvailable,

    /// The registry holds no transport handle for the node.
    #[error("no connection to node {0}")]
    NoConnection(String),

    /// The replica could not be reached or the exchange broke mid-flight.
    #[error("transport failure on node {node}: {source}")]
    Transport {
        node: String,
        #[source]
        source: reqwest::Error,
    },

    /// The attempt ran past its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The replica answered but refused the request (shedding or a
    /// malformed call).
    #[error("node {node} rejected the request with status {status}")]
    Rejected { node: String, status: u16 },

    /// Fewer replicas acknowledged a write than the quorum requires.
    /// Partial replicas may have applied; last-writer-wins reconciles on
    /// future writes.
    #[error("quorum not reached: {successes}/{required} replicas acknowledged")]
    QuorumFailed { successes: usize, required: usize },

    /// Every selected replica was tried and none produced a definitive
    /// answer.
    #[error("all {0} replicas failed")]
    ReplicasExhausted(usize),
}
