//! Replica Cache - client-side caching for a replicated key-value store
//!
//! A memory-bounded TTL/LRU cache engine with battery-gated warming and an
//! event feed, plus a cache-through adapter that keeps the cache coherent
//! with a backing store by invalidating on every write.

pub mod adapter;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use adapter::{BackingStore, CacheThroughStore, MemoryBackingStore};
pub use api::AppState;
pub use cache::CacheEngine;
pub use config::{CacheConfig, EvictionPolicy, ServerConfig};
pub use error::{CacheError, Result};
pub use models::StoredValue;
