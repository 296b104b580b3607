//! Cache-through adapter
//!
//! Single read/write surface over a [`BackingStore`] and a [`CacheEngine`].
//! Reads go through the cache and repopulate it on a miss. Writes go to the
//! backing store first and then invalidate the cached copy instead of
//! updating it, so the next read picks up whatever the store actually kept.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::BackingStore;
use crate::cache::{BatteryMonitor, CacheEngine, CacheMetrics, Lifecycle};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::models::StoredValue;

/// Most recent records loaded by initial warming.
pub const INITIAL_WARMING_LIMIT: usize = 100;

// == Cache Through Store ==
/// Cache-through reads with write-invalidate writes.
pub struct CacheThroughStore {
    store: Arc<dyn BackingStore>,
    engine: CacheEngine,
    /// Bumped on every invalidation; a miss only repopulates the cache if no
    /// invalidation happened while the backing store read was in flight.
    invalidation_epoch: Arc<AtomicU64>,
    replication_task: Mutex<Option<JoinHandle<()>>>,
    lifecycle: Mutex<Lifecycle>,
}

impl CacheThroughStore {
    // == Constructor ==
    /// Creates an adapter with a fresh engine. Must be called inside a tokio runtime.
    pub fn new(store: Arc<dyn BackingStore>, config: CacheConfig) -> Self {
        Self::with_engine(store, CacheEngine::new(config))
    }

    pub fn with_battery(
        store: Arc<dyn BackingStore>,
        config: CacheConfig,
        battery: Arc<dyn BatteryMonitor>,
    ) -> Self {
        Self::with_engine(store, CacheEngine::with_battery(config, battery))
    }

    pub fn with_engine(store: Arc<dyn BackingStore>, engine: CacheEngine) -> Self {
        Self {
            store,
            engine,
            invalidation_epoch: Arc::new(AtomicU64::new(0)),
            replication_task: Mutex::new(None),
            lifecycle: Mutex::new(Lifecycle::Active),
        }
    }

    // == Initialize ==
    /// Initializes the backing store, then warms the cache best effort.
    ///
    /// Only a failure of the backing store's own initialization is returned.
    pub async fn initialize(&self) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }

        self.store.initialize().await?;

        if self.engine.config().enable_cache_warming {
            match self.warm_from_store().await {
                Ok(warmed) => info!(warmed, "initial cache warming finished"),
                Err(e) => warn!(error = %e, "initial cache warming failed"),
            }
        }
        Ok(())
    }

    async fn warm_from_store(&self) -> Result<usize> {
        let mut records = self.store.get_all_entries().await?;
        records.retain(|record| !record.is_tombstone);
        records.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        records.truncate(INITIAL_WARMING_LIMIT);

        let warmed = self
            .engine
            .warm_cache(records.into_iter().map(|record| (record.key.clone(), record)))
            .await;
        Ok(warmed)
    }

    // == Get ==
    /// Returns the cached value, falling back to the backing store on a miss.
    pub async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        if self.is_disposed() {
            return Ok(None);
        }

        if let Some(cached) = self.engine.get(key).await {
            return Ok(Some(cached));
        }

        let epoch = self.invalidation_epoch.load(Ordering::SeqCst);
        let loaded = self.store.get(key).await?;

        if let Some(record) = &loaded {
            let filled = self
                .engine
                .put_if(key, record.clone(), None, || {
                    self.invalidation_epoch.load(Ordering::SeqCst) == epoch
                })
                .await;
            if !filled {
                debug!(key, "skipping cache fill after concurrent invalidation");
            }
        }
        Ok(loaded)
    }

    // == Put ==
    /// Writes to the backing store, then drops the cached copy.
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }

        self.store.put(key, value).await?;
        self.invalidate(key).await;
        Ok(())
    }

    /// Writes a merge result, then drops the cached copy.
    pub async fn put_with_reconciliation(&self, key: &str, value: StoredValue) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }

        self.store.put_with_reconciliation(key, value).await?;
        self.invalidate(key).await;
        Ok(())
    }

    // == Delete ==
    /// Writes a tombstone, then drops the cached copy.
    pub async fn delete(&self, key: &str, timestamp_ms: i64, node_id: &str, seq: u64) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }

        self.store.delete(key, timestamp_ms, node_id, seq).await?;
        self.invalidate(key).await;
        Ok(())
    }

    /// Reads every record straight from the backing store, bypassing the cache.
    pub async fn get_all_entries(&self) -> Result<Vec<StoredValue>> {
        if self.is_disposed() {
            return Ok(Vec::new());
        }
        self.store.get_all_entries().await
    }

    // == Tombstone GC ==
    /// Collects tombstones in the backing store. Any removal clears the
    /// whole cache.
    pub async fn garbage_collect_tombstones(&self) -> Result<usize> {
        if self.is_disposed() {
            return Ok(0);
        }

        let removed = self.store.garbage_collect_tombstones().await?;
        if removed > 0 {
            self.invalidation_epoch.fetch_add(1, Ordering::SeqCst);
            self.engine.clear().await;
            info!(removed, "tombstones collected, cache cleared");
        }
        Ok(removed)
    }

    // == Invalidation ==
    /// Drops the cached copy of `key`.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.invalidation_epoch.fetch_add(1, Ordering::SeqCst);
        self.engine.invalidate(key).await
    }

    /// Called once a remote update for `key` is merged into the backing store.
    pub async fn on_replication_event_applied(&self, key: &str) {
        self.invalidate(key).await;
    }

    pub async fn on_replication_events_applied<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.invalidation_epoch.fetch_add(1, Ordering::SeqCst);
        self.engine.invalidate_keys(keys).await;
    }

    /// Invalidates every key received on `keys`, replacing any earlier
    /// subscription.
    pub fn setup_replication_event_monitoring(&self, mut keys: mpsc::Receiver<String>) {
        if self.is_disposed() {
            return;
        }

        let engine = self.engine.clone();
        let epoch = Arc::clone(&self.invalidation_epoch);
        let handle = tokio::spawn(async move {
            while let Some(key) = keys.recv().await {
                epoch.fetch_add(1, Ordering::SeqCst);
                engine.invalidate(&key).await;
            }
            debug!("replication event stream ended");
        });

        if let Some(previous) = self.replace_replication_task(Some(handle)) {
            previous.abort();
        }
    }

    // == Maintenance ==
    /// Sweeps expired cache entries now.
    pub async fn perform_maintenance(&self) -> usize {
        self.engine.cleanup().await
    }

    /// Clears the cache only; the backing store is untouched.
    pub async fn clear_cache(&self) {
        self.invalidation_epoch.fetch_add(1, Ordering::SeqCst);
        self.engine.clear().await;
    }

    // == Accessors ==

    pub fn engine(&self) -> &CacheEngine {
        &self.engine
    }

    pub async fn metrics(&self) -> CacheMetrics {
        self.engine.metrics().await
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle() != Lifecycle::Active
    }

    fn lifecycle(&self) -> Lifecycle {
        match self.lifecycle.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        match self.lifecycle.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Moves Active to Disposing; false if disposal already started.
    fn begin_dispose(&self) -> bool {
        let mut state = match self.lifecycle.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *state != Lifecycle::Active {
            return false;
        }
        *state = Lifecycle::Disposing;
        true
    }

    fn replace_replication_task(&self, next: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut slot = match self.replication_task.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *slot, next)
    }

    // == Dispose ==
    /// Stops replication monitoring, disposes the engine, then the backing
    /// store. Later calls are no-ops.
    pub async fn dispose(&self) -> Result<()> {
        if !self.begin_dispose() {
            return Ok(());
        }

        if let Some(task) = self.replace_replication_task(None) {
            task.abort();
        }
        self.engine.dispose().await;
        let result = self.store.dispose().await;

        self.set_lifecycle(Lifecycle::Disposed);
        info!("cache-through store disposed");
        result
    }
}
