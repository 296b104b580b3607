//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Shortest pause between sweeps; a zero interval is raised to this.
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(1);

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task holds only a weak reference to the store. It stops on its own
/// once the store is dropped or no longer active; otherwise abort the
/// returned handle.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(CacheStore::new(CacheConfig::default())));
/// let cleanup_handle = spawn_cleanup_task(&store, Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    cache: &Arc<RwLock<CacheStore>>,
    cleanup_interval: Duration,
) -> JoinHandle<()> {
    let cache = Arc::downgrade(cache);
    let cleanup_interval = cleanup_interval.max(MIN_CLEANUP_INTERVAL);

    tokio::spawn(async move {
        info!(
            interval_ms = cleanup_interval.as_millis() as u64,
            "starting TTL cleanup task"
        );

        loop {
            tokio::time::sleep(cleanup_interval).await;

            let Some(cache) = cache.upgrade() else {
                break;
            };

            let removed = {
                let mut cache_guard = cache.write().await;
                if !cache_guard.lifecycle().is_active() {
                    break;
                }
                cache_guard.cleanup()
            };

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }

        debug!("TTL cleanup task stopped");
    })
}
