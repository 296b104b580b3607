//! Adapter Module
//!
//! Cache-through access to the replicated backing store.
//!
//! # Components
//! - `BackingStore`: async boundary to the durable store
//! - `CacheThroughStore`: read-through, write-invalidate adapter
//! - `MemoryBackingStore`: in-memory store for local runs and tests

mod backing;
mod cache_through;
mod memory;

pub use backing::BackingStore;
pub use cache_through::{CacheThroughStore, INITIAL_WARMING_LIMIT};
pub use memory::MemoryBackingStore;
