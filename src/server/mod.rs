//! Node Service
//!
//! The per-node request endpoint: GET/SET/DELETE/HEALTH over the RPC
//! surface, plus the sidecar health/metrics surface.
//!
//! Every RPC passes through the admission controller before it may touch
//! the cache: a rolling-window overload gate sheds work under sustained
//! CPU pressure, and a non-blocking concurrency gate bounds in-flight
//! handlers without queueing. The node-local API performs no quorum logic;
//! replication is coordinated entirely by the client.

pub mod admission;
pub mod error;
pub mod protocol;
pub mod service;

pub use admission::{AdmissionController, AdmissionError};
pub use service::{rpc_router, sidecar_router, AppState};

#[cfg(test)]
mod tests;
