//! Backup plan policy and per-database backup settings
//!
//! An environment's [`BackupPlanPolicy`] states the minimum backup cadence its
//! databases must be configured for. A database's [`BackupSetting`] states the
//! cadence it is actually configured for; [`BackupSetting::effective_schedule`]
//! derives that cadence and [`BackupPlanSchedule::is_satisfied_by`] compares
//! the two.

use crate::error::{PolicyError, Result};
use crate::policy::PolicyType;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backup cadence, used both as a requirement and as an observed setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BackupPlanSchedule {
    #[default]
    Unset,
    Daily,
    Weekly,
}

impl BackupPlanSchedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupPlanSchedule::Unset => "UNSET",
            BackupPlanSchedule::Daily => "DAILY",
            BackupPlanSchedule::Weekly => "WEEKLY",
        }
    }

    /// Whether a database backed up on `effective` cadence meets this requirement
    ///
    /// Daily satisfies a weekly requirement, but not the other way around. An
    /// unset requirement is satisfied by anything.
    pub fn is_satisfied_by(self, effective: BackupPlanSchedule) -> bool {
        match self {
            BackupPlanSchedule::Unset => true,
            BackupPlanSchedule::Daily => effective == BackupPlanSchedule::Daily,
            BackupPlanSchedule::Weekly => effective != BackupPlanSchedule::Unset,
        }
    }
}

impl fmt::Display for BackupPlanSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupPlanSchedule {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "UNSET" => Ok(BackupPlanSchedule::Unset),
            "DAILY" => Ok(BackupPlanSchedule::Daily),
            "WEEKLY" => Ok(BackupPlanSchedule::Weekly),
            other => Err(PolicyError::InvalidValue {
                field: "backup plan policy schedule",
                value: other.to_string(),
            }),
        }
    }
}

/// Policy configuration for the backup plan of an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackupPlanPolicy {
    pub schedule: BackupPlanSchedule,
}

impl BackupPlanPolicy {
    pub fn new(schedule: BackupPlanSchedule) -> Self {
        Self { schedule }
    }

    pub(crate) fn decode(payload: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            schedule: String,
        }

        let raw: Raw = serde_json::from_str(payload).map_err(|source| PolicyError::Malformed {
            policy_type: PolicyType::BackupPlan,
            payload: payload.to_string(),
            source,
        })?;

        Ok(Self {
            schedule: raw.schedule.parse()?,
        })
    }
}

/// Sentinel used by backup settings for "not configured"
pub const UNSET: i32 = -1;

fn unset() -> i32 {
    UNSET
}

/// Automatic backup configuration of a single database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSetting {
    pub database_id: i64,

    #[serde(default)]
    pub enabled: bool,

    /// Hour of day the backup runs, or [`UNSET`]
    #[serde(default = "unset")]
    pub hour: i32,

    /// Day of week the backup runs, or [`UNSET`] for every day
    #[serde(default = "unset")]
    pub day_of_week: i32,

    pub updated_ts: DateTime<Utc>,
}

impl BackupSetting {
    /// The cadence this setting actually produces backups at
    pub fn effective_schedule(&self) -> BackupPlanSchedule {
        if !self.enabled || self.hour == UNSET {
            return BackupPlanSchedule::Unset;
        }
        if self.day_of_week == UNSET {
            BackupPlanSchedule::Daily
        } else {
            BackupPlanSchedule::Weekly
        }
    }

    /// Cadence a completed backup is expected at, and the maximum age the
    /// latest completed backup may have
    pub fn expected_cadence(&self) -> (BackupPlanSchedule, Duration) {
        if self.day_of_week == UNSET {
            (BackupPlanSchedule::Daily, Duration::hours(24))
        } else {
            (BackupPlanSchedule::Weekly, Duration::days(7))
        }
    }

    /// A setting changed within the last backup window has not had a chance
    /// to produce a backup yet.
    pub fn in_grace_period(&self, now: DateTime<Utc>) -> bool {
        let (_, max_age) = self.expected_cadence();
        self.updated_ts >= now - max_age
    }
}
