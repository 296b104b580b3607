//! Cache Store Module
//!
//! Synchronous cache core combining the LRU map with TTL expiry, memory
//! accounting, battery gated warming and event publication. Shared access
//! goes through [`CacheEngine`](crate::cache::CacheEngine), which wraps the
//! store in a single lock.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::{
    AccessFrequency, AmpleBattery, BatteryMonitor, CacheEntry, CacheEvent, CacheEventType,
    CacheMetrics, EventFeed, Lifecycle, LruMap,
};
use crate::config::CacheConfig;
use crate::models::StoredValue;

/// Fraction of the memory budget an eviction pass frees down to.
const EVICTION_TARGET_RATIO: f64 = 0.8;

/// Key reported on events that are not about a single entry.
pub const ALL_KEYS: &str = "*";

// == Cache Store ==
/// Bounded cache with LRU eviction, TTL expiry and memory accounting.
pub struct CacheStore {
    /// Entries in recency order
    entries: LruMap<CacheEntry>,
    /// Sum of `estimated_size_bytes` over `entries`
    memory_usage: usize,
    frequency: AccessFrequency,
    metrics: CacheMetrics,
    config: CacheConfig,
    events: EventFeed,
    battery: Arc<dyn BatteryMonitor>,
    lifecycle: Lifecycle,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .field("memory_usage", &self.memory_usage)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store that always sees an ample battery.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_battery(config, Arc::new(AmpleBattery))
    }

    /// Creates a store reading battery state from `battery`.
    pub fn with_battery(config: CacheConfig, battery: Arc<dyn BatteryMonitor>) -> Self {
        Self {
            entries: LruMap::new(),
            memory_usage: 0,
            frequency: AccessFrequency::new(config.max_entries),
            metrics: CacheMetrics::new(),
            config,
            events: EventFeed::new(),
            battery,
            lifecycle: Lifecycle::Active,
        }
    }

    // == Get ==
    /// Returns the cached value for `key` if present and unexpired.
    ///
    /// Expired entries are removed and counted as both a miss and an
    /// expiration. Every call is timed.
    pub fn get(&mut self, key: &str) -> Option<StoredValue> {
        let started = Instant::now();
        let result = self.lookup(key);
        self.metrics.record_operation_time(started.elapsed());
        result
    }

    fn lookup(&mut self, key: &str) -> Option<StoredValue> {
        if !self.lifecycle.is_active() || self.config.is_excluded(key) {
            self.metrics.record_miss();
            return None;
        }

        self.frequency.track(key);

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.metrics.record_miss();
                self.events.publish(CacheEvent::new(CacheEventType::Miss, key));
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.metrics.record_miss();
            self.metrics.record_expiration();
            self.events
                .publish(CacheEvent::new(CacheEventType::Expiration, key));
            debug!(key, "expired entry removed on access");
            return None;
        }

        let value = self.entries.get_mut(key).map(|entry| {
            entry.mark_accessed();
            entry.value.clone()
        });
        self.entries.touch(key);
        self.metrics.record_hit();
        self.events.publish(CacheEvent::new(CacheEventType::Hit, key));
        value
    }

    // == Put ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// Uses the configured default TTL when `ttl` is `None`. Excluded keys
    /// are ignored.
    pub fn put(&mut self, key: impl Into<String>, value: StoredValue, ttl: Option<Duration>) {
        let key = key.into();
        if !self.lifecycle.is_active() || self.config.is_excluded(&key) {
            return;
        }

        let ttl = ttl.unwrap_or(self.config.default_ttl);

        // Drop the old entry first so its bytes are not double counted
        self.remove_entry(&key);

        let entry = CacheEntry::new(&key, value, ttl);
        let size = entry.estimated_size_bytes;
        self.ensure_memory_constraints(size);
        self.insert_entry(key.clone(), entry);

        self.metrics.record_put();
        self.events.publish(
            CacheEvent::new(CacheEventType::Put, key)
                .with("size", size)
                .with("ttl", ttl.as_millis() as u64),
        );
    }

    // == Contains ==
    /// True if `key` is cached and unexpired. Records nothing.
    pub fn contains(&self, key: &str) -> bool {
        self.lifecycle.is_active()
            && self
                .entries
                .get(key)
                .map(|entry| !entry.is_expired())
                .unwrap_or(false)
    }

    /// Inspects an entry without touching recency or metrics.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Entries from least to most recently used.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter()
    }

    // == Invalidate ==
    /// Removes `key` if cached. Absent keys are a silent no-op.
    pub fn invalidate(&mut self, key: &str) -> bool {
        if !self.lifecycle.is_active() {
            return false;
        }

        match self.remove_entry(key) {
            Some(_) => {
                self.metrics.record_invalidation();
                self.events
                    .publish(CacheEvent::new(CacheEventType::Invalidation, key));
                debug!(key, "cache entry invalidated");
                true
            }
            None => false,
        }
    }

    /// Invalidates each key; returns how many were cached.
    pub fn invalidate_keys<I, S>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .filter(|key| self.invalidate(key.as_ref()))
            .count()
    }

    // == Clear ==
    /// Empties the cache and the access frequency table.
    pub fn clear(&mut self) {
        if !self.lifecycle.is_active() {
            return;
        }

        let dropped = self.entries.len();
        self.entries.clear();
        self.frequency.clear();
        self.memory_usage = 0;
        self.metrics.update_memory_usage(0);
        self.metrics.record_clear();
        debug!(dropped, "cache cleared");
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were removed.
    pub fn cleanup(&mut self) -> usize {
        if !self.lifecycle.is_active() {
            return 0;
        }

        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.to_string())
            .collect();

        let count = expired_keys.len();
        for key in &expired_keys {
            self.remove_entry(key);
            self.metrics.record_expiration();
        }

        self.metrics.record_cleanup();
        if count > 0 {
            self.events.publish(
                CacheEvent::new(CacheEventType::Cleanup, ALL_KEYS).with("removed_count", count),
            );
        }
        count
    }

    // == Warm Cache ==
    /// Inserts entries ahead of demand and returns how many were inserted.
    ///
    /// The whole call is skipped on low battery when battery aware refresh is
    /// enabled. Keys already cached or excluded are left alone.
    pub fn warm_cache<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = (String, StoredValue)>,
    {
        if !self.lifecycle.is_active() {
            return 0;
        }

        if self.config.battery_aware_refresh {
            if let Some(status) = self.battery.current_status() {
                if status.is_below(self.config.low_battery_threshold) {
                    self.metrics.record_battery_throttle();
                    warn!(
                        level = status.level,
                        threshold = self.config.low_battery_threshold,
                        "cache warming skipped on low battery"
                    );
                    return 0;
                }
            }
        }

        let ttl = self.config.default_ttl;
        let mut warmed = 0;

        for (key, value) in entries {
            if self.config.is_excluded(&key) || self.entries.contains(&key) {
                continue;
            }

            let entry = CacheEntry::warm_loaded(&key, value, ttl);
            let size = entry.estimated_size_bytes;
            self.ensure_memory_constraints(size);
            self.insert_entry(key.clone(), entry);

            self.metrics.record_warming();
            self.events
                .publish(CacheEvent::new(CacheEventType::Warming, key).with("size", size));
            warmed += 1;
        }

        if warmed > 0 {
            info!(warmed, "cache warmed");
        }
        warmed
    }

    // == Warming Candidates ==
    /// Frequently requested keys that are not cached and not excluded.
    pub fn warming_candidates(&self) -> HashSet<String> {
        self.frequency
            .keys_at_least(self.config.warming_threshold)
            .filter(|key| !self.entries.contains(key) && !self.config.is_excluded(key))
            .map(String::from)
            .collect()
    }

    // == Dispose ==
    /// Tears down all state and closes the event feed.
    ///
    /// Returns false if the store was already disposed.
    pub fn dispose(&mut self) -> bool {
        if !self.lifecycle.is_active() {
            return false;
        }

        self.lifecycle = Lifecycle::Disposing;
        self.entries.clear();
        self.frequency.clear();
        self.memory_usage = 0;
        self.metrics.update_memory_usage(0);
        self.events.close();
        self.lifecycle = Lifecycle::Disposed;
        true
    }

    // == Accessors ==

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current estimated memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    /// Snapshot of the metrics.
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.clone()
    }

    /// Zeroes counters and gauges; the gauges catch up on the next mutation.
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    pub fn access_count(&self, key: &str) -> u64 {
        self.frequency.count(key)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Memory Constraints ==
    /// Evicts least recently used entries so `additional` bytes fit.
    ///
    /// Nothing happens while both the memory budget and the entry cap have
    /// room. Otherwise entries are evicted until usage falls to 80% of the
    /// budget, and at least `additional` bytes when the entry cap is reached.
    fn ensure_memory_constraints(&mut self, additional: usize) {
        let projected = self.memory_usage + additional;
        let over_memory = projected > self.config.max_memory_bytes;
        let at_capacity = self.entries.len() >= self.config.max_entries;

        if !over_memory && !at_capacity {
            return;
        }

        if over_memory {
            self.metrics.record_memory_pressure();
        }

        let target = (self.config.max_memory_bytes as f64 * EVICTION_TARGET_RATIO) as usize;
        let mut to_free = projected.saturating_sub(target);
        if at_capacity {
            to_free = to_free.max(additional);
        }

        let mut freed = 0;
        while freed < to_free {
            let Some((key, entry)) = self.entries.pop_oldest() else {
                break;
            };
            let size = entry.estimated_size_bytes;
            self.memory_usage = self.memory_usage.saturating_sub(size);
            freed += size;

            self.metrics.record_eviction();
            self.events
                .publish(CacheEvent::new(CacheEventType::Eviction, key.as_str()).with("size", size));
            debug!(key = %key, size, "evicted least recently used entry");
        }

        self.metrics.update_memory_usage(self.memory_usage);
    }

    fn insert_entry(&mut self, key: String, entry: CacheEntry) {
        self.memory_usage += entry.estimated_size_bytes;
        self.entries.insert(key, entry);
        self.metrics.update_memory_usage(self.memory_usage);
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.memory_usage = self.memory_usage.saturating_sub(entry.estimated_size_bytes);
        self.metrics.update_memory_usage(self.memory_usage);
        Some(entry)
    }
}
