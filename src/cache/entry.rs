//! Cache Entry Module
//!
//! Per-key metadata wrapper around a stored value.

use std::time::{Duration, Instant};

use crate::models::StoredValue;

/// Fixed per-entry bookkeeping overhead in bytes.
pub const ENTRY_OVERHEAD_BYTES: usize = 100;

/// Access count from which an entry counts as hot.
const HOT_ACCESS_COUNT: u64 = 5;

/// Recency window for hot entries.
const HOT_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Expiry used when `now + ttl` cannot be represented.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// == Cache Entry ==
/// Represents a single cached value with expiry and access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached record
    pub value: StoredValue,
    /// Fixed at creation, independent of any TTL carried by the record
    pub expires_at: Instant,
    pub last_access_time: Instant,
    /// Always at least 1
    pub access_count: u64,
    /// Fixed at creation
    pub estimated_size_bytes: usize,
    /// Inserted by cache warming rather than a put
    pub is_warm_loaded: bool,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(key: &str, value: StoredValue, ttl: Duration) -> Self {
        Self::build(key, value, ttl, false)
    }

    /// Creates an entry inserted by cache warming.
    pub fn warm_loaded(key: &str, value: StoredValue, ttl: Duration) -> Self {
        Self::build(key, value, ttl, true)
    }

    fn build(key: &str, value: StoredValue, ttl: Duration, is_warm_loaded: bool) -> Self {
        let now = Instant::now();
        let estimated_size_bytes = estimate_size(key, &value);

        Self {
            value,
            expires_at: now.checked_add(ttl).unwrap_or_else(|| now + FAR_FUTURE),
            last_access_time: now,
            access_count: 1,
            estimated_size_bytes,
            is_warm_loaded,
        }
    }

    // == Mark Accessed ==
    /// Records a cache hit on this entry.
    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
        self.last_access_time = Instant::now();
    }

    // == Is Expired ==
    /// Returns true once the current instant is strictly past `expires_at`.
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }

    pub fn time_since_last_access(&self) -> Duration {
        self.last_access_time.elapsed()
    }

    /// Remaining lifetime, zero once expired.
    pub fn time_until_expiration(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Informational only; eviction ignores it.
    pub fn is_hot(&self) -> bool {
        self.access_count >= HOT_ACCESS_COUNT && self.time_since_last_access() < HOT_WINDOW
    }
}

// == Size Estimation ==
/// Approximates the in-memory cost of an entry using UTF-16 code units.
///
/// Tombstones are charged for the key and overhead only.
pub fn estimate_size(key: &str, value: &StoredValue) -> usize {
    let key_bytes = key.encode_utf16().count() * 2;
    let value_bytes = value
        .live_value()
        .map(|v| v.encode_utf16().count() * 2)
        .unwrap_or(0);

    key_bytes + value_bytes + ENTRY_OVERHEAD_BYTES
}
