//! Sentinel Metrics and Telemetry
//!
//! Tracks what each scan cycle looked at and what it changed in the ledger.

use crate::model::{DatabaseId, InstanceId};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Result of one detector for one database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutcome {
    /// An active anomaly was upserted
    Raised,
    /// The active anomaly, if any, was archived
    Cleared,
    /// The detector did not run; the anomaly was left untouched
    #[default]
    Skipped,
    /// The detector or the ledger write failed; the anomaly was left untouched
    Failed,
}

/// Outcome of every detector for one database
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatabaseScan {
    pub database_id: DatabaseId,
    pub connectivity: CheckOutcome,
    pub schema_drift: CheckOutcome,
    pub backup_policy: CheckOutcome,
    pub backup_missing: CheckOutcome,
}

impl DatabaseScan {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            ..Default::default()
        }
    }

    pub fn outcomes(&self) -> [CheckOutcome; 4] {
        [
            self.connectivity,
            self.schema_drift,
            self.backup_policy,
            self.backup_missing,
        ]
    }
}

/// Outcome of scanning one instance
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstanceReport {
    pub instance_id: InstanceId,

    /// The database list could not be loaded, so nothing was scanned
    pub listing_failed: bool,

    pub databases: Vec<DatabaseScan>,
}

impl InstanceReport {
    pub fn new(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            ..Default::default()
        }
    }

    pub fn database(&self, database_id: DatabaseId) -> Option<&DatabaseScan> {
        self.databases.iter().find(|d| d.database_id == database_id)
    }
}

/// Statistics from a single scan cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Instances whose databases were scanned
    pub instances_scanned: usize,

    /// Instances skipped because their environment is archived or missing
    pub skipped_archived: usize,

    /// Instances skipped because a scan of them was already running
    pub skipped_busy: usize,

    /// Instances skipped because their admin data source could not be resolved
    pub skipped_unresolved: usize,

    /// Instances whose scan failed as a whole (database listing, panics)
    pub instances_failed: usize,

    pub databases_scanned: usize,
    pub anomalies_raised: usize,
    pub anomalies_cleared: usize,
    pub checks_skipped: usize,
    pub checks_failed: usize,

    /// Time taken to complete the cycle
    pub duration: Option<Duration>,
}

impl CycleReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_instances(&self) -> usize {
        self.instances_scanned
            + self.skipped_archived
            + self.skipped_busy
            + self.skipped_unresolved
            + self.instances_failed
    }

    /// Share of detector runs that failed (0.0 - 1.0)
    pub fn failure_ratio(&self) -> f64 {
        let total = self.anomalies_raised + self.anomalies_cleared + self.checks_failed;
        if total == 0 {
            0.0
        } else {
            self.checks_failed as f64 / total as f64
        }
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Cycle: {} instances | {} scanned | {} archived env | {} busy | {} unresolved | {} failed | {} databases | {} raised | {} cleared | {} check failures",
            self.total_instances(),
            self.instances_scanned,
            self.skipped_archived,
            self.skipped_busy,
            self.skipped_unresolved,
            self.instances_failed,
            self.databases_scanned,
            self.anomalies_raised,
            self.anomalies_cleared,
            self.checks_failed,
        )
    }
}

/// Builder for tracking cycle progress
#[derive(Debug, Clone)]
pub struct CycleReportBuilder {
    report: CycleReport,
    start_time: Instant,
}

impl CycleReportBuilder {
    pub fn new() -> Self {
        Self {
            report: CycleReport::new(),
            start_time: Instant::now(),
        }
    }

    pub fn record_archived(&mut self) {
        self.report.skipped_archived += 1;
    }

    pub fn record_busy(&mut self) {
        self.report.skipped_busy += 1;
    }

    pub fn record_unresolved(&mut self) {
        self.report.skipped_unresolved += 1;
    }

    pub fn record_instance_failure(&mut self) {
        self.report.instances_failed += 1;
    }

    /// Fold the outcome of one instance scan into the cycle
    pub fn record_instance(&mut self, instance: &InstanceReport) {
        if instance.listing_failed {
            self.report.instances_failed += 1;
            return;
        }

        self.report.instances_scanned += 1;
        for database in &instance.databases {
            self.report.databases_scanned += 1;
            for outcome in database.outcomes() {
                match outcome {
                    CheckOutcome::Raised => self.report.anomalies_raised += 1,
                    CheckOutcome::Cleared => self.report.anomalies_cleared += 1,
                    CheckOutcome::Skipped => self.report.checks_skipped += 1,
                    CheckOutcome::Failed => self.report.checks_failed += 1,
                }
            }
        }
    }

    /// Finalize and return the report
    pub fn finish(mut self) -> CycleReport {
        self.report.duration = Some(self.start_time.elapsed());
        self.report
    }

    pub fn report(&self) -> &CycleReport {
        &self.report
    }
}

impl Default for CycleReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
