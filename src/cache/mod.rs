//! Per-Node Cache
//!
//! A bounded in-memory key-value store with LRU eviction and per-entry TTL.
//!
//! ## Core Concepts
//! - **Recency list**: an intrusive doubly linked list threaded through the
//!   entries themselves, giving O(1) move-to-front on hits and O(1) tail
//!   eviction when the store is over capacity.
//! - **Lazy expiry**: an expired entry is removed by the `get` that observes
//!   it; a background sweep (`cleanup`) reclaims the rest.
//! - **Single lock**: one exclusive lock covers the index and the list, so
//!   no reader ever observes the list in a torn state.

pub mod store;

pub use store::{Cache, CacheStats};
