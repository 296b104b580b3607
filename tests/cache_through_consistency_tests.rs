//! Consistency Tests for the Cache-Through Adapter
//!
//! Drives random sequences of reads, writes, deletes and replication
//! notifications and checks every read against the backing store.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use replica_cache::cache::CacheEventType;
use replica_cache::{BackingStore, CacheConfig, CacheThroughStore, MemoryBackingStore, StoredValue};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
enum AdapterOp {
    Get(String),
    Put(String, String),
    Delete(String),
    RemoteWrite(String, String),
    Maintenance,
    CollectTombstones,
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-d]".prop_map(|s| s)
}

fn op_strategy() -> impl Strategy<Value = AdapterOp> {
    prop_oneof![
        4 => key_strategy().prop_map(AdapterOp::Get),
        3 => (key_strategy(), "[a-z]{1,8}").prop_map(|(k, v)| AdapterOp::Put(k, v)),
        1 => key_strategy().prop_map(AdapterOp::Delete),
        2 => (key_strategy(), "[a-z]{1,8}").prop_map(|(k, v)| AdapterOp::RemoteWrite(k, v)),
        1 => Just(AdapterOp::Maintenance),
        1 => Just(AdapterOp::CollectTombstones),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Every read through the adapter matches what the backing store holds
    #[test]
    fn prop_reads_match_backing_store(ops in prop::collection::vec(op_strategy(), 1..60)) {
        tokio_test::block_on(async {
            let store = Arc::new(MemoryBackingStore::new("node-a"));
            let adapter = CacheThroughStore::new(store.clone(), CacheConfig::default());
            let mut remote_seq = 0;

            for op in ops {
                match op {
                    AdapterOp::Get(key) => {
                        let through = adapter.get(&key).await.unwrap();
                        let direct = store.get(&key).await.unwrap();
                        assert_eq!(through, direct, "stale read for {}", key);
                    }
                    AdapterOp::Put(key, value) => adapter.put(&key, &value).await.unwrap(),
                    AdapterOp::Delete(key) => {
                        adapter.delete(&key, 0, "node-a", 0).await.unwrap();
                    }
                    AdapterOp::RemoteWrite(key, value) => {
                        // A replication merge lands in the store and is then reported
                        remote_seq += 1;
                        let record = StoredValue::new(&key, value, "node-b", remote_seq, i64::MAX - 1);
                        store.put_with_reconciliation(&key, record).await.unwrap();
                        adapter.on_replication_event_applied(&key).await;
                    }
                    AdapterOp::Maintenance => {
                        adapter.perform_maintenance().await;
                    }
                    AdapterOp::CollectTombstones => {
                        adapter.garbage_collect_tombstones().await.unwrap();
                    }
                }
            }

            adapter.dispose().await.unwrap();
        });
    }
}

#[tokio::test]
async fn test_replication_stream_invalidates_cached_keys() {
    let store = Arc::new(MemoryBackingStore::new("node-a"));
    let adapter = CacheThroughStore::new(store.clone(), CacheConfig::default());
    let (tx, rx) = mpsc::channel(16);
    adapter.setup_replication_event_monitoring(rx);

    store.put("k", "v1").await.unwrap();
    adapter.get("k").await.unwrap();
    let mut events = adapter.engine().subscribe().await;

    let remote = StoredValue::new("k", "v2", "node-b", 1, i64::MAX - 1);
    store.put_with_reconciliation("k", remote).await.unwrap();
    tx.send("k".to_string()).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.event_type, CacheEventType::Invalidation);

    let record = adapter.get("k").await.unwrap().unwrap();
    assert_eq!(record.value.as_deref(), Some("v2"));

    adapter.dispose().await.unwrap();
}

#[tokio::test]
async fn test_initialize_warms_most_recent_records() {
    let store = Arc::new(MemoryBackingStore::new("node-a"));
    for i in 0..150 {
        let key = format!("key{}", i);
        store
            .insert_record(StoredValue::new(&key, "v", "node-a", i as u64, i as i64))
            .await;
    }
    store
        .insert_record(StoredValue::tombstone("dead", "node-a", 999, 10_000))
        .await;

    let adapter = CacheThroughStore::new(store.clone(), CacheConfig::default());
    adapter.initialize().await.unwrap();

    let engine = adapter.engine();
    assert_eq!(engine.len().await, 100);
    assert!(engine.contains("key149").await);
    assert!(engine.contains("key50").await);
    assert!(!engine.contains("key49").await);
    assert!(!engine.contains("dead").await);
    assert_eq!(engine.metrics().await.warmings, 100);

    adapter.dispose().await.unwrap();
}
