//! Backup policy violation and missing backup detectors

use super::{with_timeout, ScanExecutor};
use crate::error::StoreError;
use crate::metrics::CheckOutcome;
use crate::model::{
    AnomalyPayload, AnomalyType, BackupMissingPayload, BackupPolicyViolationPayload,
    BackupStatus, Database, Instance,
};
use chrono::{DateTime, Utc};
use driftguard_core_policy::{BackupPlanPolicy, BackupSetting};
use tracing::{debug, error, warn};

impl ScanExecutor {
    /// Check the backup setting of `database` against the environment's
    /// backup plan policy and against its own backup history
    ///
    /// Returns the policy violation outcome and the missing backup outcome.
    pub async fn check_backup(
        &self,
        instance: &Instance,
        database: &Database,
        backup_policy: Option<&BackupPlanPolicy>,
        now: DateTime<Utc>,
    ) -> (CheckOutcome, CheckOutcome) {
        let setting = match with_timeout(
            self.call_timeout,
            self.backups.find_backup_setting(database.id),
            StoreError::Timeout,
        )
        .await
        {
            Ok(setting) => Some(setting),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                error!(
                    instance = %instance.name,
                    database = %database.name,
                    error = %e,
                    "Failed to retrieve backup setting"
                );
                return (CheckOutcome::Failed, CheckOutcome::Failed);
            }
        };

        let policy = self
            .check_backup_policy(instance, database, backup_policy, setting.as_ref())
            .await;
        let missing = self
            .check_backup_missing(instance, database, setting.as_ref(), now)
            .await;

        (policy, missing)
    }

    async fn check_backup_policy(
        &self,
        instance: &Instance,
        database: &Database,
        backup_policy: Option<&BackupPlanPolicy>,
        setting: Option<&BackupSetting>,
    ) -> CheckOutcome {
        let Some(policy) = backup_policy else {
            warn!(
                instance = %instance.name,
                environment_id = instance.environment_id,
                "No backup plan policy for environment, skipping policy check"
            );
            return CheckOutcome::Skipped;
        };

        // A database without a setting takes no backups at all
        let actual_schedule = setting
            .map(BackupSetting::effective_schedule)
            .unwrap_or_default();

        if policy.schedule.is_satisfied_by(actual_schedule) {
            return self
                .clear(instance, database, AnomalyType::DatabaseBackupPolicyViolation)
                .await;
        }

        let payload = AnomalyPayload::BackupPolicyViolation(BackupPolicyViolationPayload {
            environment_id: instance.environment_id,
            expected_schedule: policy.schedule,
            actual_schedule,
        });
        self.raise(instance, database, payload).await
    }

    async fn check_backup_missing(
        &self,
        instance: &Instance,
        database: &Database,
        setting: Option<&BackupSetting>,
        now: DateTime<Utc>,
    ) -> CheckOutcome {
        let setting = match setting {
            Some(setting) if setting.enabled => setting,
            // No backups are expected
            _ => {
                return self
                    .clear(instance, database, AnomalyType::DatabaseBackupMissing)
                    .await
            }
        };

        if setting.in_grace_period(now) {
            debug!(
                instance = %instance.name,
                database = %database.name,
                "Backup setting changed recently, skipping missing backup check"
            );
            return CheckOutcome::Skipped;
        }

        let (expected_schedule, max_age) = setting.expected_cadence();

        let backups = match with_timeout(
            self.call_timeout,
            self.backups.find_backups(database.id, BackupStatus::Done),
            StoreError::Timeout,
        )
        .await
        {
            Ok(backups) => backups,
            Err(e) => {
                error!(
                    instance = %instance.name,
                    database = %database.name,
                    error = %e,
                    "Failed to retrieve backup list"
                );
                return CheckOutcome::Failed;
            }
        };

        let last_backup_ts = backups.iter().map(|b| b.updated_ts).max();

        match last_backup_ts {
            Some(ts) if ts >= now - max_age => {
                self.clear(instance, database, AnomalyType::DatabaseBackupMissing)
                    .await
            }
            _ => {
                let payload = AnomalyPayload::BackupMissing(BackupMissingPayload {
                    expected_schedule,
                    last_backup_ts,
                });
                self.raise(instance, database, payload).await
            }
        }
    }
}
