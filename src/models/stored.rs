//! Stored value model
//!
//! The record type owned by the backing store. The cache treats it as opaque
//! apart from `key` (lookup) and `timestamp_ms` (initial warming order).

use serde::{Deserialize, Serialize};

/// A replicated key-value record.
///
/// `value` is `None` when the record represents a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredValue {
    pub key: String,
    pub value: Option<String>,
    /// Replica that produced the write
    pub node_id: String,
    /// Per-replica monotonically assigned sequence number
    pub seq: u64,
    pub timestamp_ms: i64,
    pub is_tombstone: bool,
}

impl StoredValue {
    /// Creates a live record.
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        node_id: impl Into<String>,
        seq: u64,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            node_id: node_id.into(),
            seq,
            timestamp_ms,
            is_tombstone: false,
        }
    }

    /// Creates a deletion marker.
    pub fn tombstone(
        key: impl Into<String>,
        node_id: impl Into<String>,
        seq: u64,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            key: key.into(),
            value: None,
            node_id: node_id.into(),
            seq,
            timestamp_ms,
            is_tombstone: true,
        }
    }

    /// Returns the payload of a live record.
    pub fn live_value(&self) -> Option<&str> {
        if self.is_tombstone {
            None
        } else {
            self.value.as_deref()
        }
    }
}
