//! Quorum Client
//!
//! The coordinator side of the cluster: resolves each call against the
//! placement ring, fans out over durable per-node connections, and settles
//! the call by the configured quorum.
//!
//! ## Call shapes
//! - **Writes** (SET/DELETE) fan out to every selected replica in parallel
//!   and return as soon as the success threshold is met. Writes are never
//!   hedged; every replica receives exactly one attempt.
//! - **Reads** walk the ordered replicas serially; a definitive answer
//!   (found or not-found) from any replica ends the call. Within one
//!   replica attempt, hedging may race a delayed sibling request against
//!   the primary one to cut tail latency.

pub mod connections;
pub mod coordinator;
pub mod error;

pub use connections::{ConnectionRegistry, NodeConnection};
pub use coordinator::{CacheClient, ClientConfig, ClientStats};
pub use error::ClientError;
