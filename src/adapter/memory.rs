//! In-memory backing store
//!
//! A single-node [`BackingStore`] holding records in a map. Used by the
//! inspection server and by tests; it supports injected failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::BackingStore;
use crate::error::{CacheError, Result};
use crate::models::StoredValue;

/// Map-backed store with last-writer-wins reconciliation.
#[derive(Debug)]
pub struct MemoryBackingStore {
    node_id: String,
    records: RwLock<HashMap<String, StoredValue>>,
    next_seq: AtomicU64,
    /// Tombstones younger than this survive garbage collection
    tombstone_grace: Duration,
    failing: AtomicBool,
    reads: AtomicUsize,
    initialized: AtomicBool,
    disposed: AtomicBool,
}

impl MemoryBackingStore {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            records: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            tombstone_grace: Duration::ZERO,
            failing: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            initialized: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn with_tombstone_grace(mut self, grace: Duration) -> Self {
        self.tombstone_grace = grace;
        self
    }

    /// Stores `record` as is, bypassing sequencing and merge.
    pub async fn insert_record(&self, record: StoredValue) {
        self.records.write().await.insert(record.key.clone(), record);
    }

    /// Makes every subsequent call fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `get` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("injected failure".to_string()));
        }
        if self.is_disposed() {
            return Err(CacheError::Backend("store disposed".to_string()));
        }
        Ok(())
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }
}

/// Ordering used to pick the winner of two concurrent writes.
fn version(record: &StoredValue) -> (i64, &str, u64) {
    (record.timestamp_ms, record.node_id.as_str(), record.seq)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl BackingStore for MemoryBackingStore {
    async fn initialize(&self) -> Result<()> {
        self.check()?;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        let record = StoredValue::new(key, value, self.node_id.as_str(), self.next_seq(), now_ms());
        self.records.write().await.insert(key.to_string(), record);
        Ok(())
    }

    async fn put_with_reconciliation(&self, key: &str, value: StoredValue) -> Result<()> {
        self.check()?;
        let mut records = self.records.write().await;

        let incoming_wins = records
            .get(key)
            .map(|current| version(&value) > version(current))
            .unwrap_or(true);

        if incoming_wins {
            records.insert(key.to_string(), value);
        } else {
            debug!(key, "reconciled write lost to newer local record");
        }
        Ok(())
    }

    async fn delete(&self, key: &str, timestamp_ms: i64, node_id: &str, seq: u64) -> Result<()> {
        self.check()?;
        let tombstone = StoredValue::tombstone(key, node_id, seq, timestamp_ms);
        self.records.write().await.insert(key.to_string(), tombstone);
        Ok(())
    }

    async fn get_all_entries(&self) -> Result<Vec<StoredValue>> {
        self.check()?;
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn garbage_collect_tombstones(&self) -> Result<usize> {
        self.check()?;
        let cutoff = now_ms() - self.tombstone_grace.as_millis() as i64;

        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_tombstone || record.timestamp_ms > cutoff);
        Ok(before - records.len())
    }

    async fn dispose(&self) -> Result<()> {
        self.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_assigns_sequence() {
        let store = MemoryBackingStore::new("node-a");
        store.put("k", "v1").await.unwrap();
        store.put("k", "v2").await.unwrap();

        let record = store.get("k").await.unwrap().unwrap();
        assert_eq!(record.value.as_deref(), Some("v2"));
        assert_eq!(record.node_id, "node-a");
        assert_eq!(record.seq, 2);
    }

    #[tokio::test]
    async fn test_reconciliation_is_last_writer_wins() {
        let store = MemoryBackingStore::new("node-a");
        store
            .insert_record(StoredValue::new("k", "local", "node-a", 5, 2_000))
            .await;

        store
            .put_with_reconciliation("k", StoredValue::new("k", "stale", "node-b", 9, 1_000))
            .await
            .unwrap();
        assert_eq!(
            store.get("k").await.unwrap().unwrap().value.as_deref(),
            Some("local")
        );

        store
            .put_with_reconciliation("k", StoredValue::new("k", "remote", "node-b", 1, 3_000))
            .await
            .unwrap();
        assert_eq!(
            store.get("k").await.unwrap().unwrap().value.as_deref(),
            Some("remote")
        );
    }

    #[tokio::test]
    async fn test_delete_and_garbage_collect() {
        let store = MemoryBackingStore::new("node-a");
        store.put("keep", "v").await.unwrap();
        store.put("drop", "v").await.unwrap();

        store.delete("drop", now_ms() - 10, "node-a", 3).await.unwrap();
        assert!(store.get("drop").await.unwrap().unwrap().is_tombstone);

        assert_eq!(store.garbage_collect_tombstones().await.unwrap(), 1);
        assert!(store.get("drop").await.unwrap().is_none());
        assert!(store.get("keep").await.unwrap().is_some());
        assert_eq!(store.garbage_collect_tombstones().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_grace_period_keeps_recent_tombstones() {
        let store = MemoryBackingStore::new("node-a").with_tombstone_grace(Duration::from_secs(3600));
        store.delete("k", now_ms(), "node-a", 1).await.unwrap();

        assert_eq!(store.garbage_collect_tombstones().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryBackingStore::new("node-a");
        store.set_failing(true);

        assert!(matches!(store.get("k").await, Err(CacheError::Backend(_))));
        assert!(matches!(store.put("k", "v").await, Err(CacheError::Backend(_))));

        store.set_failing(false);
        assert!(store.get("k").await.unwrap().is_none());
    }
}
