//! Sentinel configuration
//!
//! Defines how often the Sentinel sweeps the fleet and how it bounds the work
//! of each sweep.

use crate::model::{PrincipalId, SYSTEM_BOT_ID};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sentinel operational configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Pause between the end of one scan cycle and the start of the next
    ///
    /// **Default:** 1800 (30 minutes)
    pub scan_interval_s: u64,

    /// Maximum number of instances scanned at the same time
    ///
    /// The default of 1 scans instances one after another, which is what
    /// stores that serialize writes (e.g. embedded SQLite) require. Raise it
    /// only when every store tolerates concurrent writers.
    ///
    /// **Default:** 1
    pub max_parallel_scans: usize,

    /// Upper bound on each external call made while scanning an instance
    ///
    /// `None` leaves calls unbounded, so an unreachable instance holds its
    /// scan slot until the driver gives up on its own.
    ///
    /// **Default:** None
    pub call_timeout_s: Option<u64>,

    /// Principal recorded as the creator of anomalies
    ///
    /// **Default:** 1 (system bot)
    pub actor_id: PrincipalId,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            scan_interval_s: 1800,
            max_parallel_scans: 1,
            call_timeout_s: None,
            actor_id: SYSTEM_BOT_ID,
        }
    }
}

impl SentinelConfig {
    pub fn with_interval(scan_interval_s: u64) -> Self {
        Self {
            scan_interval_s,
            ..Default::default()
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_s)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_s.map(Duration::from_secs)
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.scan_interval_s == 0 {
            return Err("scan_interval_s must be greater than 0".to_string());
        }

        if self.max_parallel_scans == 0 {
            return Err("max_parallel_scans must be at least 1".to_string());
        }

        if self.call_timeout_s == Some(0) {
            return Err("call_timeout_s must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}
