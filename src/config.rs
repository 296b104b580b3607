//! Configuration Module
//!
//! Holds the immutable cache policy bundle and loads it from environment variables.

use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Bytes in one mebibyte.
pub const MIB: usize = 1024 * 1024;

// == Eviction Policy ==
/// Advisory eviction policy.
///
/// The engine always removes in LRU order bounded by memory and entry count;
/// the policy is carried for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    Lru,
    Ttl,
    #[default]
    Hybrid,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "ttl" => Ok(Self::Ttl),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown eviction policy: {}", other)),
        }
    }
}

// == Cache Config ==
/// Cache policy and sizing knobs.
///
/// Constructed once and never mutated; use the `with_*` methods to derive
/// a copy with overrides. Values are not validated.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Memory budget in bytes for all cached entries
    pub max_memory_bytes: usize,
    /// TTL applied when a put does not specify one
    pub default_ttl: Duration,
    /// Advisory eviction policy
    pub policy: EvictionPolicy,
    /// Skip warming on low battery when not charging
    pub battery_aware_refresh: bool,
    /// Keys that are never cached
    pub excluded_keys: HashSet<String>,
    /// Warm the cache from the backing store on initialize
    pub enable_cache_warming: bool,
    /// Minimum access count for a key to be a warming candidate
    pub warming_threshold: u64,
    /// Maximum number of cached entries
    pub max_entries: usize,
    /// Interval of the background expiry sweep
    pub cleanup_interval: Duration,
    /// Battery percentage below which warming is skipped
    pub low_battery_threshold: u8,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: 50 * MIB,
            default_ttl: Duration::from_secs(5 * 60),
            policy: EvictionPolicy::Hybrid,
            battery_aware_refresh: true,
            excluded_keys: HashSet::new(),
            enable_cache_warming: true,
            warming_threshold: 5,
            max_entries: 10_000,
            cleanup_interval: Duration::from_secs(60),
            low_battery_threshold: 20,
        }
    }
}

impl CacheConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the config from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_MEMORY_MB` - Memory budget in MiB (default: 50)
    /// - `CACHE_DEFAULT_TTL_SECS` - Default TTL in seconds (default: 300)
    /// - `CACHE_POLICY` - `lru`, `ttl` or `hybrid` (default: hybrid)
    /// - `CACHE_BATTERY_AWARE` - Battery gated warming (default: true)
    /// - `CACHE_EXCLUDED_KEYS` - Comma separated keys never cached (default: none)
    /// - `CACHE_WARMING` - Initial warming (default: true)
    /// - `CACHE_WARMING_THRESHOLD` - Warming candidate access count (default: 5)
    /// - `CACHE_MAX_ENTRIES` - Entry cap (default: 10000)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Expiry sweep interval (default: 60)
    /// - `CACHE_LOW_BATTERY_THRESHOLD` - Battery percent (default: 20)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let excluded_keys = env::var("CACHE_EXCLUDED_KEYS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or(defaults.excluded_keys);

        Self {
            max_memory_bytes: env_parse::<usize>("CACHE_MAX_MEMORY_MB")
                .map(|mb| mb * MIB)
                .unwrap_or(defaults.max_memory_bytes),
            default_ttl: env_parse::<u64>("CACHE_DEFAULT_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_ttl),
            policy: env_parse("CACHE_POLICY").unwrap_or(defaults.policy),
            battery_aware_refresh: env_parse("CACHE_BATTERY_AWARE")
                .unwrap_or(defaults.battery_aware_refresh),
            excluded_keys,
            enable_cache_warming: env_parse("CACHE_WARMING")
                .unwrap_or(defaults.enable_cache_warming),
            warming_threshold: env_parse("CACHE_WARMING_THRESHOLD")
                .unwrap_or(defaults.warming_threshold),
            max_entries: env_parse("CACHE_MAX_ENTRIES").unwrap_or(defaults.max_entries),
            cleanup_interval: env_parse::<u64>("CACHE_CLEANUP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            low_battery_threshold: env_parse("CACHE_LOW_BATTERY_THRESHOLD")
                .unwrap_or(defaults.low_battery_threshold),
        }
    }

    // == Overrides ==

    pub fn with_max_memory_bytes(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    /// Sets the memory budget in mebibytes.
    pub fn max_memory_mb(self, mb: usize) -> Self {
        self.with_max_memory_bytes(mb * MIB)
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_battery_aware_refresh(mut self, enabled: bool) -> Self {
        self.battery_aware_refresh = enabled;
        self
    }

    pub fn with_excluded_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cache_warming(mut self, enabled: bool) -> Self {
        self.enable_cache_warming = enabled;
        self
    }

    pub fn with_warming_threshold(mut self, threshold: u64) -> Self {
        self.warming_threshold = threshold;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Intervals below one millisecond are raised to one millisecond by the sweep task.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_low_battery_threshold(mut self, percent: u8) -> Self {
        self.low_battery_threshold = percent;
        self
    }

    /// Returns true if `key` must never be cached.
    pub fn is_excluded(&self, key: &str) -> bool {
        self.excluded_keys.contains(key)
    }
}

// == Server Config ==
/// Settings for the inspection server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port
    pub server_port: u16,
}

impl ServerConfig {
    /// Loads `SERVER_PORT` (default: 3000).
    pub fn from_env() -> Self {
        Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { server_port: 3000 }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
