//! Distributed In-Memory Cache Cluster Library
//!
//! This library crate defines the core modules that make up the cache
//! cluster. It serves as the foundation for the node binary (`main.rs`)
//! and for embedding the client coordinator in other programs.
//!
//! ## Architecture Modules
//! The system is composed of five loosely coupled subsystems:
//!
//! - **`cache`**: The per-node store. A bounded LRU cache with per-entry
//!   TTL, an intrusive recency list for O(1) hits, and lazy plus swept
//!   expiry.
//! - **`ring`**: The placement layer. Rendezvous (highest-random-weight)
//!   hashing deterministically maps every key to an ordered set of
//!   replicas, moving only a minimal fraction of keys when membership
//!   changes.
//! - **`server`**: The per-node request endpoint. Serves GET/SET/DELETE/
//!   HEALTH over the RPC surface and health/metrics on a sidecar port,
//!   with admission control (load shedding + bounded concurrency) in
//!   front of every RPC.
//! - **`client`**: The coordinator. Fans writes out to the replica set
//!   and settles on a quorum of acknowledgments; reads walk the replicas
//!   in placement order with per-replica request hedging.
//! - **`tasks`**: Background maintenance, currently the periodic TTL
//!   sweep.

pub mod cache;
pub mod client;
pub mod config;
pub mod ring;
pub mod server;
pub mod tasks;
