//! Cache Engine Module
//!
//! Shareable async handle over a [`CacheStore`] guarded by one lock, owning
//! the background expiry sweep for its whole lifetime.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{
    AmpleBattery, BatteryMonitor, CacheEvent, CacheMetrics, CacheStore, Lifecycle,
};
use crate::config::CacheConfig;
use crate::models::StoredValue;
use crate::tasks::spawn_cleanup_task;

// == Cache Engine ==
/// Cloneable handle to a bounded cache instance.
///
/// Every operation takes the write lock for its full critical section, so
/// map, memory counter and frequency updates never interleave. Must be
/// created inside a tokio runtime.
#[derive(Clone)]
pub struct CacheEngine {
    store: Arc<RwLock<CacheStore>>,
    config: Arc<CacheConfig>,
    cleanup_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl CacheEngine {
    /// Creates an engine that never throttles warming on battery.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_battery(config, Arc::new(AmpleBattery))
    }

    /// Creates an engine and starts its cleanup task.
    pub fn with_battery(config: CacheConfig, battery: Arc<dyn BatteryMonitor>) -> Self {
        let interval = config.cleanup_interval;
        let store = Arc::new(RwLock::new(CacheStore::with_battery(config.clone(), battery)));
        let handle = spawn_cleanup_task(&store, interval);

        Self {
            store,
            config: Arc::new(config),
            cleanup_task: Arc::new(Mutex::new(Some(handle))),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredValue> {
        self.store.write().await.get(key)
    }

    pub async fn put(&self, key: &str, value: StoredValue, ttl: Option<Duration>) {
        self.store.write().await.put(key, value, ttl);
    }

    /// Puts only if `still_valid` holds once the lock is taken.
    ///
    /// Lets a caller fill the cache from a slower source without racing a
    /// concurrent invalidation. Returns whether the put ran.
    pub async fn put_if<F>(
        &self,
        key: &str,
        value: StoredValue,
        ttl: Option<Duration>,
        still_valid: F,
    ) -> bool
    where
        F: FnOnce() -> bool,
    {
        let mut store = self.store.write().await;
        if !still_valid() {
            return false;
        }
        store.put(key, value, ttl);
        true
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.store.read().await.contains(key)
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.store.write().await.invalidate(key)
    }

    pub async fn invalidate_keys<I, S>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.store.write().await.invalidate_keys(keys)
    }

    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    /// Runs an expiry sweep now, outside the periodic schedule.
    pub async fn cleanup(&self) -> usize {
        self.store.write().await.cleanup()
    }

    pub async fn warm_cache<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (String, StoredValue)>,
    {
        self.store.write().await.warm_cache(entries)
    }

    pub async fn warming_candidates(&self) -> HashSet<String> {
        self.store.read().await.warming_candidates()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub async fn memory_usage(&self) -> usize {
        self.store.read().await.memory_usage()
    }

    pub async fn metrics(&self) -> CacheMetrics {
        self.store.read().await.metrics()
    }

    pub async fn reset_metrics(&self) {
        self.store.write().await.reset_metrics();
    }

    /// Subscribes to the event feed. Events published before this call are not replayed.
    pub async fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.store.read().await.subscribe()
    }

    pub async fn is_disposed(&self) -> bool {
        self.store.read().await.lifecycle() != Lifecycle::Active
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Dispose ==
    /// Stops the cleanup task and tears down all state. Safe to call repeatedly.
    ///
    /// The task is aborted while the store lock is held, so no sweep can run
    /// against the torn down store.
    pub async fn dispose(&self) {
        let mut store = self.store.write().await;
        if store.lifecycle() != Lifecycle::Active {
            return;
        }

        if let Some(handle) = self.take_cleanup_task() {
            handle.abort();
        }

        if store.dispose() {
            info!("cache engine disposed");
        }
    }

    fn take_cleanup_task(&self) -> Option<JoinHandle<()>> {
        match self.cleanup_task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEventType, FixedBattery};
    use tokio::sync::broadcast::error::RecvError;

    fn value(key: &str, v: &str) -> StoredValue {
        StoredValue::new(key, v, "node-a", 1, 0)
    }

    #[tokio::test]
    async fn test_engine_put_get() {
        let engine = CacheEngine::new(CacheConfig::default());

        engine.put("k", value("k", "v"), None).await;

        assert_eq!(engine.get("k").await.unwrap().value.as_deref(), Some("v"));
        assert!(engine.contains("k").await);
        assert_eq!(engine.len().await, 1);
        assert_eq!(engine.metrics().await.hits, 1);

        engine.dispose().await;
    }

    #[tokio::test]
    async fn test_engine_put_if() {
        let engine = CacheEngine::new(CacheConfig::default());

        assert!(!engine.put_if("k", value("k", "v"), None, || false).await);
        assert!(!engine.contains("k").await);

        assert!(engine.put_if("k", value("k", "v"), None, || true).await);
        assert!(engine.contains("k").await);

        engine.dispose().await;
    }

    #[tokio::test]
    async fn test_engine_lru_example() {
        let engine = CacheEngine::new(CacheConfig::default().with_max_entries(3));

        for key in ["key1", "key2", "key3"] {
            engine.put(key, value(key, "v"), None).await;
        }
        engine.get("key1").await;
        engine.put("key4", value("key4", "v"), None).await;

        assert!(!engine.contains("key2").await);
        for key in ["key1", "key3", "key4"] {
            assert!(engine.contains(key).await, "{} should remain", key);
        }

        engine.dispose().await;
    }

    #[tokio::test]
    async fn test_engine_battery_gated_warming() {
        let battery = Arc::new(FixedBattery::new(15, false));
        let engine = CacheEngine::with_battery(CacheConfig::default(), battery.clone());

        let warmed = engine
            .warm_cache(vec![("k".to_string(), value("k", "v"))])
            .await;
        assert_eq!(warmed, 0);
        assert_eq!(engine.metrics().await.battery_throttle_events, 1);

        battery.set_status(Some(crate::cache::BatteryStatus::new(15, true)));
        let warmed = engine
            .warm_cache(vec![("k".to_string(), value("k", "v"))])
            .await;
        assert_eq!(warmed, 1);
        assert!(engine.contains("k").await);

        engine.dispose().await;
    }

    #[tokio::test]
    async fn test_engine_events_reach_subscribers() {
        let engine = CacheEngine::new(CacheConfig::default());
        let mut events = engine.subscribe().await;

        engine.put("k", value("k", "v"), None).await;

        let event = events.recv().await.unwrap();
        assert_eq!(event.event_type, CacheEventType::Put);
        assert_eq!(event.key, "k");

        engine.dispose().await;
    }

    #[tokio::test]
    async fn test_engine_dispose_twice() {
        let engine = CacheEngine::new(CacheConfig::default());
        let mut events = engine.subscribe().await;
        engine.put("k", value("k", "v"), None).await;

        engine.dispose().await;
        engine.dispose().await;

        assert!(engine.is_disposed().await);
        assert!(engine.get("k").await.is_none());
        assert!(!engine.contains("k").await);
        assert_eq!(engine.memory_usage().await, 0);

        engine.put("k", value("k", "v"), None).await;
        engine.clear().await;
        assert!(engine.is_empty().await);

        // The feed closes after buffered events drain
        assert_eq!(events.recv().await.unwrap().event_type, CacheEventType::Put);
        assert!(matches!(events.recv().await, Err(RecvError::Closed)));
    }

    #[tokio::test]
    async fn test_engine_dispose_stops_cleanup_task() {
        let engine = CacheEngine::new(
            CacheConfig::default().with_cleanup_interval(Duration::from_millis(10)),
        );
        let task = engine.cleanup_task.clone();

        engine.dispose().await;

        assert!(task.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_engine_clones_share_state() {
        let engine = CacheEngine::new(CacheConfig::default());
        let other = engine.clone();

        engine.put("shared", value("shared", "v"), None).await;
        assert!(other.contains("shared").await);

        other.dispose().await;
        assert!(engine.is_disposed().await);
    }
}
