//! Cache Module
//!
//! Memory-bounded caching with TTL expiry, LRU eviction and battery gated warming.

mod battery;
mod engine;
mod entry;
mod events;
mod frequency;
mod lifecycle;
mod lru;
mod metrics;
mod store;


// Re-export public types
pub use battery::{AmpleBattery, BatteryMonitor, BatteryOptimization, BatteryStatus, FixedBattery};
pub use engine::CacheEngine;
pub use entry::{estimate_size, CacheEntry, ENTRY_OVERHEAD_BYTES};
pub use events::{CacheEvent, CacheEventType, EventFeed, EVENT_FEED_CAPACITY};
pub use frequency::AccessFrequency;
pub use lifecycle::Lifecycle;
pub use lru::LruMap;
pub use metrics::CacheMetrics;
pub use store::{CacheStore, ALL_KEYS};
