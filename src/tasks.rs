//! Background maintenance tasks.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;

/// Spawns the periodic TTL sweep.
///
/// Each tick takes one pass over the store and removes every entry whose
/// expiry has passed; lazy expiry on reads covers the gap between passes.
/// Abort the returned handle during shutdown.
pub fn spawn_sweeper(cache: Arc<Cache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting TTL sweep every {:?}", interval);
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh node does
        // not sweep an empty store.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = cache.cleanup();
            if removed > 0 {
                info!(removed, "TTL sweep removed expired entries");
            } else {
                debug!("TTL sweep found nothing to remove");
            }
        }
    })
}
