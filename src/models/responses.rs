//! Response DTOs for the inspection API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cache::CacheMetrics;
use crate::models::StoredValue;

/// Response body for GET /get/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Option<String>,
    pub node_id: String,
    pub seq: u64,
    pub timestamp_ms: i64,
}

impl From<StoredValue> for GetResponse {
    fn from(record: StoredValue) -> Self {
        Self {
            key: record.key,
            value: record.value,
            node_id: record.node_id,
            seq: record.seq,
            timestamp_ms: record.timestamp_ms,
        }
    }
}

/// Response body for PUT /set
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was written
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' written, cached copy invalidated", key),
            key,
        }
    }
}

/// Response body for DELETE /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub key: String,
    /// False when the key was not cached
    pub invalidated: bool,
}

/// Response body for POST /cache/clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

/// Response body for POST /cache/maintenance
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceResponse {
    /// Expired entries removed by the sweep
    pub removed: usize,
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Current number of cached entries
    pub entries: usize,
    /// Exported metric snapshot
    pub metrics: Map<String, Value>,
    /// Human readable summary
    pub summary: String,
}

impl StatsResponse {
    pub fn new(entries: usize, metrics: &CacheMetrics) -> Self {
        Self {
            entries,
            metrics: metrics.to_map(),
            summary: metrics.summary(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "disposed"
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(disposed: bool) -> Self {
        let status = if disposed { "disposed" } else { "healthy" };
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
