//! Scan Cycle Executor: runs the detectors for one database
//!
//! Four detectors cover each database:
//!
//! | Detector            | Anomaly type                         | Evidence                          |
//! |---------------------|--------------------------------------|-----------------------------------|
//! | connectivity        | `bb.anomaly.database.connection`     | driver connect                    |
//! | schema drift        | `bb.anomaly.database.schema.drift`   | live dump vs. latest history      |
//! | backup policy       | `bb.anomaly.database.backup.policy-violation` | setting vs. environment policy |
//! | backup missing      | `bb.anomaly.database.backup.missing` | latest completed backup           |
//!
//! Schema drift runs only over a successful connection. The backup detectors
//! work from persisted backup facts and run regardless of connectivity.
//!
//! Every detector ends in exactly one of: upsert the active anomaly (the
//! condition holds), archive it (the condition was checked and does not
//! hold), or leave it untouched (the evidence could not be gathered).

mod backup;
mod connectivity;

use crate::config::SentinelConfig;
use crate::driver::Driver;
use crate::error::StoreError;
use crate::metrics::{CheckOutcome, DatabaseScan};
use crate::model::{
    AnomalyPayload, AnomalyType, AnomalyUpsert, DataSource, Database, Instance, PrincipalId,
};
use crate::store::{AnomalyLedger, BackupStore, Collaborators};
use chrono::{DateTime, Utc};
use driftguard_core_policy::BackupPlanPolicy;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Await `call`, giving up after `limit` when one is set
pub(crate) async fn with_timeout<T, E, F>(
    limit: Option<Duration>,
    call: F,
    on_timeout: fn(Duration) -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(limit)),
        },
        None => call.await,
    }
}

/// Runs the detectors of one database and reconciles the ledger
pub struct ScanExecutor {
    ledger: Arc<dyn AnomalyLedger>,
    backups: Arc<dyn BackupStore>,
    driver: Arc<dyn Driver>,
    actor_id: PrincipalId,
    call_timeout: Option<Duration>,
}

impl ScanExecutor {
    pub fn new(collaborators: &Collaborators, config: &SentinelConfig) -> Self {
        Self {
            ledger: collaborators.ledger.clone(),
            backups: collaborators.backups.clone(),
            driver: collaborators.driver.clone(),
            actor_id: config.actor_id,
            call_timeout: config.call_timeout(),
        }
    }

    /// Run every detector for `database`
    ///
    /// `backup_policy` is the backup plan policy of the instance's environment.
    pub async fn scan_database(
        &self,
        instance: &Instance,
        data_source: &DataSource,
        database: &Database,
        backup_policy: Option<&BackupPlanPolicy>,
        now: DateTime<Utc>,
    ) -> DatabaseScan {
        let mut scan = DatabaseScan::new(database.id);

        let (connectivity, schema_drift) = self
            .check_connection(instance, data_source, database)
            .await;
        scan.connectivity = connectivity;
        scan.schema_drift = schema_drift;

        let (backup_policy, backup_missing) = self
            .check_backup(instance, database, backup_policy, now)
            .await;
        scan.backup_policy = backup_policy;
        scan.backup_missing = backup_missing;

        scan
    }

    /// Upsert the active anomaly described by `payload`
    async fn raise(
        &self,
        instance: &Instance,
        database: &Database,
        payload: AnomalyPayload,
    ) -> CheckOutcome {
        let anomaly_type = payload.anomaly_type();

        let payload = match payload.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    instance = %instance.name,
                    database = %database.name,
                    anomaly_type = %anomaly_type,
                    error = %e,
                    "Failed to marshal anomaly payload"
                );
                return CheckOutcome::Failed;
            }
        };

        let upsert = AnomalyUpsert {
            creator_id: self.actor_id,
            instance_id: instance.id,
            database_id: database.id,
            anomaly_type,
            payload,
        };

        match with_timeout(
            self.call_timeout,
            self.ledger.upsert_active(upsert),
            StoreError::Timeout,
        )
        .await
        {
            Ok(anomaly) => {
                debug!(
                    instance = %instance.name,
                    database = %database.name,
                    anomaly_type = %anomaly_type,
                    anomaly_id = anomaly.id,
                    "Recorded active anomaly"
                );
                CheckOutcome::Raised
            }
            Err(e) => {
                error!(
                    instance = %instance.name,
                    database = %database.name,
                    anomaly_type = %anomaly_type,
                    error = %e,
                    "Failed to create anomaly"
                );
                CheckOutcome::Failed
            }
        }
    }

    /// Archive the active anomaly of `anomaly_type`, if there is one
    async fn clear(
        &self,
        instance: &Instance,
        database: &Database,
        anomaly_type: AnomalyType,
    ) -> CheckOutcome {
        match with_timeout(
            self.call_timeout,
            self.ledger.archive(database.id, anomaly_type),
            StoreError::Timeout,
        )
        .await
        {
            Ok(()) => CheckOutcome::Cleared,
            // Nothing was active
            Err(e) if e.is_not_found() => CheckOutcome::Cleared,
            Err(e) => {
                error!(
                    instance = %instance.name,
                    database = %database.name,
                    anomaly_type = %anomaly_type,
                    error = %e,
                    "Failed to close anomaly"
                );
                CheckOutcome::Failed
            }
        }
    }
}
