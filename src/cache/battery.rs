//! Battery Status Module
//!
//! Boundary to the device battery collaborator. The engine reads only
//! `level` and `is_charging` to gate cache warming.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Level below which the device is treated as critically low.
const CRITICAL_LEVEL: u8 = 15;

/// Level below which background work is reduced.
const LOW_LEVEL: u8 = 30;

// == Battery Status ==
/// A point-in-time battery reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatteryStatus {
    /// Charge percentage, 0..=100
    pub level: u8,
    pub is_charging: bool,
    pub is_power_save_mode: bool,
    pub is_low_power_mode: bool,
    pub timestamp: DateTime<Utc>,
}

impl BatteryStatus {
    pub fn new(level: u8, is_charging: bool) -> Self {
        Self {
            level: level.min(100),
            is_charging,
            is_power_save_mode: false,
            is_low_power_mode: false,
            timestamp: Utc::now(),
        }
    }

    /// True when level is under `threshold` percent and the device is not charging.
    pub fn is_below(&self, threshold: u8) -> bool {
        self.level < threshold && !self.is_charging
    }
}

// == Battery Optimization ==
/// Background-work profile derived from the battery state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatteryOptimization {
    pub keep_alive_seconds: u64,
    pub sync_interval_seconds: u64,
    pub throttle_operations: bool,
    pub reduce_background: bool,
    pub max_concurrent_operations: usize,
    pub defer_non_critical_requests: bool,
}

impl Default for BatteryOptimization {
    fn default() -> Self {
        Self {
            keep_alive_seconds: 60,
            sync_interval_seconds: 30,
            throttle_operations: false,
            reduce_background: false,
            max_concurrent_operations: 4,
            defer_non_critical_requests: false,
        }
    }
}

impl BatteryOptimization {
    /// Picks a profile for `status`; unknown or charging means no restrictions.
    pub fn for_status(status: Option<&BatteryStatus>) -> Self {
        let Some(status) = status else {
            return Self::default();
        };
        if status.is_charging {
            return Self::default();
        }

        if status.level < CRITICAL_LEVEL || status.is_low_power_mode {
            Self {
                keep_alive_seconds: 300,
                sync_interval_seconds: 300,
                throttle_operations: true,
                reduce_background: true,
                max_concurrent_operations: 1,
                defer_non_critical_requests: true,
            }
        } else if status.level < LOW_LEVEL || status.is_power_save_mode {
            Self {
                keep_alive_seconds: 120,
                sync_interval_seconds: 120,
                throttle_operations: true,
                reduce_background: true,
                max_concurrent_operations: 2,
                defer_non_critical_requests: false,
            }
        } else {
            Self::default()
        }
    }
}

// == Battery Monitor ==
/// Source of battery readings, shared and externally owned.
pub trait BatteryMonitor: Send + Sync {
    /// Latest reading, `None` when unknown.
    fn current_status(&self) -> Option<BatteryStatus>;

    fn optimization(&self) -> BatteryOptimization {
        BatteryOptimization::for_status(self.current_status().as_ref())
    }
}

/// Default monitor reporting a full battery.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmpleBattery;

impl BatteryMonitor for AmpleBattery {
    fn current_status(&self) -> Option<BatteryStatus> {
        Some(BatteryStatus::new(100, false))
    }
}

/// Monitor returning whatever reading was last set.
#[derive(Debug, Default)]
pub struct FixedBattery {
    status: RwLock<Option<BatteryStatus>>,
}

impl FixedBattery {
    pub fn new(level: u8, is_charging: bool) -> Self {
        Self {
            status: RwLock::new(Some(BatteryStatus::new(level, is_charging))),
        }
    }

    pub fn set_status(&self, status: Option<BatteryStatus>) {
        if let Ok(mut guard) = self.status.write() {
            *guard = status;
        }
    }
}

impl BatteryMonitor for FixedBattery {
    fn current_status(&self) -> Option<BatteryStatus> {
        self.status.read().ok().and_then(|guard| guard.clone())
    }
}
