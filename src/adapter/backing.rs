//! Backing store boundary
//!
//! The durable, replicated store the adapter reads through and writes to.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::StoredValue;

/// Durable key-value store consumed by [`CacheThroughStore`](super::CacheThroughStore).
///
/// Errors are surfaced to the adapter's caller unchanged.
#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn initialize(&self) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<StoredValue>>;

    /// Local write; the store assigns node id, sequence and timestamp.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Write produced by conflict resolution. The store may keep its current
    /// record if that one wins the merge.
    async fn put_with_reconciliation(&self, key: &str, value: StoredValue) -> Result<()>;

    /// Writes a tombstone for `key`.
    async fn delete(&self, key: &str, timestamp_ms: i64, node_id: &str, seq: u64) -> Result<()>;

    /// Every record including tombstones.
    async fn get_all_entries(&self) -> Result<Vec<StoredValue>>;

    /// Drops eligible tombstones and returns how many were removed.
    async fn garbage_collect_tombstones(&self) -> Result<usize>;

    async fn dispose(&self) -> Result<()>;
}
