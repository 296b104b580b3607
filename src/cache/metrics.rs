//! Cache Metrics Module
//!
//! Tracks cache counters, memory gauges and operation timing.

use std::fmt;
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};

use crate::config::MIB;

// == Cache Metrics ==
/// Monotonic counters and gauges for one cache engine.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub invalidations: u64,
    pub clears: u64,
    pub warmings: u64,
    pub cleanups: u64,
    pub memory_pressure_events: u64,
    pub battery_throttle_events: u64,
    /// Current memory gauge in bytes
    pub memory_usage_bytes: usize,
    /// Highest memory gauge observed since the last reset
    pub peak_memory_usage_bytes: usize,
    pub total_operation_time: Duration,
    pub operation_count: u64,
    /// Never changed by `reset`
    started_at: Instant,
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheMetrics {
    // == Constructor ==
    /// Creates a new CacheMetrics with all counters at zero.
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            puts: 0,
            evictions: 0,
            expirations: 0,
            invalidations: 0,
            clears: 0,
            warmings: 0,
            cleanups: 0,
            memory_pressure_events: 0,
            battery_throttle_events: 0,
            memory_usage_bytes: 0,
            peak_memory_usage_bytes: 0,
            total_operation_time: Duration::ZERO,
            operation_count: 0,
            started_at: Instant::now(),
        }
    }

    // == Recorders ==

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_put(&mut self) {
        self.puts += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }

    pub fn record_clear(&mut self) {
        self.clears += 1;
    }

    pub fn record_warming(&mut self) {
        self.warmings += 1;
    }

    pub fn record_cleanup(&mut self) {
        self.cleanups += 1;
    }

    pub fn record_memory_pressure(&mut self) {
        self.memory_pressure_events += 1;
    }

    pub fn record_battery_throttle(&mut self) {
        self.battery_throttle_events += 1;
    }

    // == Gauges ==
    /// Sets the current memory gauge and raises the peak if exceeded.
    pub fn update_memory_usage(&mut self, bytes: usize) {
        self.memory_usage_bytes = bytes;
        if bytes > self.peak_memory_usage_bytes {
            self.peak_memory_usage_bytes = bytes;
        }
    }

    /// Adds one timed operation to the accumulator.
    pub fn record_operation_time(&mut self, elapsed: Duration) {
        self.total_operation_time += elapsed;
        self.operation_count += 1;
    }

    // == Derived ==

    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    pub fn average_operation_time(&self) -> Duration {
        if self.operation_count == 0 {
            Duration::ZERO
        } else {
            let avg_nanos = self.total_operation_time.as_nanos() / self.operation_count as u128;
            Duration::from_nanos(avg_nanos as u64)
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    // == Reset ==
    /// Zeroes every counter and gauge. The uptime origin is kept.
    pub fn reset(&mut self) {
        *self = Self {
            started_at: self.started_at,
            ..Self::new()
        };
    }

    // == Export ==
    /// Exports a snapshot under stable snake_case keys.
    pub fn to_map(&self) -> Map<String, Value> {
        let average_us = self.average_operation_time().as_nanos() as f64 / 1_000.0;

        let snapshot = json!({
            "hit_count": self.hits,
            "miss_count": self.misses,
            "hit_rate": self.hit_rate(),
            "miss_rate": self.miss_rate(),
            "put_count": self.puts,
            "eviction_count": self.evictions,
            "expiration_count": self.expirations,
            "invalidation_count": self.invalidations,
            "clear_count": self.clears,
            "warming_count": self.warmings,
            "cleanup_count": self.cleanups,
            "memory_usage_bytes": self.memory_usage_bytes,
            "peak_memory_usage_bytes": self.peak_memory_usage_bytes,
            "memory_pressure_events": self.memory_pressure_events,
            "battery_throttle_events": self.battery_throttle_events,
            "average_operation_time_us": average_us,
            "operation_count": self.operation_count,
            "uptime_seconds": self.uptime().as_secs(),
        });

        match snapshot {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        format!(
            "CacheMetrics(hit rate: {:.1}%, hits: {}, misses: {}, evictions: {}, memory: {:.1} MB, uptime: {} min)",
            self.hit_rate() * 100.0,
            self.hits,
            self.misses,
            self.evictions,
            self.memory_usage_bytes as f64 / MIB as f64,
            self.uptime().as_secs() / 60,
        )
    }
}

impl fmt::Display for CacheMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.hits, 0);
        assert_eq!(metrics.misses, 0);
        assert_eq!(metrics.evictions, 0);
        assert_eq!(metrics.memory_usage_bytes, 0);
        assert_eq!(metrics.operation_count, 0);
    }

    #[test]
    fn test_rates_no_requests() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.hit_rate(), 0.0);
        assert_eq!(metrics.miss_rate(), 1.0);
    }

    #[test]
    fn test_rates_mixed() {
        let mut metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        assert_eq!(metrics.hit_rate(), 0.75);
        assert_eq!(metrics.miss_rate(), 0.25);
    }

    #[test]
    fn test_average_operation_time() {
        let mut metrics = CacheMetrics::new();
        assert_eq!(metrics.average_operation_time(), Duration::ZERO);

        metrics.record_operation_time(Duration::from_micros(100));
        metrics.record_operation_time(Duration::from_micros(200));
        metrics.record_operation_time(Duration::from_micros(300));

        assert_eq!(metrics.total_operation_time, Duration::from_micros(600));
        assert_eq!(metrics.average_operation_time(), Duration::from_micros(200));
        assert_eq!(metrics.operation_count, 3);
    }

    #[test]
    fn test_peak_memory_never_decreases() {
        let mut metrics = CacheMetrics::new();
        metrics.update_memory_usage(500);
        metrics.update_memory_usage(1_500);
        metrics.update_memory_usage(200);

        assert_eq!(metrics.memory_usage_bytes, 200);
        assert_eq!(metrics.peak_memory_usage_bytes, 1_500);
    }

    #[test]
    fn test_reset_keeps_uptime_origin() {
        let mut metrics = CacheMetrics::new();
        let origin = metrics.started_at;
        metrics.record_hit();
        metrics.record_eviction();
        metrics.update_memory_usage(42);
        metrics.record_operation_time(Duration::from_micros(5));

        metrics.reset();

        assert_eq!(metrics.hits, 0);
        assert_eq!(metrics.evictions, 0);
        assert_eq!(metrics.memory_usage_bytes, 0);
        assert_eq!(metrics.peak_memory_usage_bytes, 0);
        assert_eq!(metrics.operation_count, 0);
        assert_eq!(metrics.started_at, origin);
    }

    #[test]
    fn test_to_map_keys() {
        let mut metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_battery_throttle();
        let map = metrics.to_map();

        let expected = [
            "hit_count",
            "miss_count",
            "hit_rate",
            "miss_rate",
            "put_count",
            "eviction_count",
            "expiration_count",
            "invalidation_count",
            "clear_count",
            "warming_count",
            "cleanup_count",
            "memory_usage_bytes",
            "peak_memory_usage_bytes",
            "memory_pressure_events",
            "battery_throttle_events",
            "average_operation_time_us",
            "operation_count",
            "uptime_seconds",
        ];
        assert_eq!(map.len(), expected.len());
        for key in expected {
            assert!(map.contains_key(key), "missing key {}", key);
        }
        assert_eq!(map["hit_count"], 1);
        assert_eq!(map["battery_throttle_events"], 1);
    }

    #[test]
    fn test_summary_format() {
        let mut metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_miss();
        metrics.update_memory_usage(MIB + MIB / 2);

        let summary = metrics.to_string();
        assert!(summary.contains("hit rate: 50.0%"), "{}", summary);
        assert!(summary.contains("memory: 1.5 MB"), "{}", summary);
        assert!(summary.contains("uptime: 0 min"), "{}", summary);
    }
}
