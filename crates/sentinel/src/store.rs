//! Contracts of the control plane stores the Sentinel reads from and the
//! anomaly ledger it writes to.
//!
//! The Sentinel never owns persistence. Every store is expected to provide its
//! own internal consistency; no call made by the Sentinel spans more than one
//! row, and every ledger write targets exactly one (database, type) key.

use crate::driver::Driver;
use crate::error::StoreError;
use crate::model::{
    Anomaly, AnomalyType, AnomalyUpsert, Backup, BackupStatus, DataSource, Database, DatabaseId,
    Environment, EnvironmentId, Instance, InstanceId, RowStatus,
};
use async_trait::async_trait;
use driftguard_core_policy::{BackupPlanPolicy, BackupSetting, PipelineApprovalPolicy};
use std::sync::Arc;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Environments, instances and databases
#[async_trait]
pub trait TopologyStore: Send + Sync {
    async fn list_environments(&self) -> StoreResult<Vec<Environment>>;

    /// List instances, optionally only those with the given row status
    async fn list_instances(&self, row_status: Option<RowStatus>) -> StoreResult<Vec<Instance>>;

    async fn list_databases(&self, instance_id: InstanceId) -> StoreResult<Vec<Database>>;

    /// Resolve the admin credentials of an instance
    async fn admin_data_source(&self, instance: &Instance) -> StoreResult<DataSource>;
}

/// Environment policies; a missing policy resolves to the type's default
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get_backup_plan_policy(
        &self,
        environment_id: EnvironmentId,
    ) -> StoreResult<BackupPlanPolicy>;

    async fn get_pipeline_approval_policy(
        &self,
        environment_id: EnvironmentId,
    ) -> StoreResult<PipelineApprovalPolicy>;
}

/// Backup settings and backup records
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Returns [`StoreError::NotFound`] if the database never had a setting
    async fn find_backup_setting(&self, database_id: DatabaseId) -> StoreResult<BackupSetting>;

    /// Backups of a database in the given status, most recent first
    async fn find_backups(
        &self,
        database_id: DatabaseId,
        status: BackupStatus,
    ) -> StoreResult<Vec<Backup>>;
}

/// Persistent set of anomaly facts
///
/// Implementations must hold at most one active anomaly per
/// (database, type): an upsert overwrites the active row rather than adding
/// a second one.
#[async_trait]
pub trait AnomalyLedger: Send + Sync {
    async fn upsert_active(&self, upsert: AnomalyUpsert) -> StoreResult<Anomaly>;

    /// Archive the active anomaly of a (database, type)
    ///
    /// Returns [`StoreError::NotFound`] if there is none.
    async fn archive(&self, database_id: DatabaseId, anomaly_type: AnomalyType)
        -> StoreResult<()>;
}

/// Everything the Sentinel talks to
#[derive(Clone)]
pub struct Collaborators {
    pub topology: Arc<dyn TopologyStore>,
    pub policies: Arc<dyn PolicyStore>,
    pub backups: Arc<dyn BackupStore>,
    pub ledger: Arc<dyn AnomalyLedger>,
    pub driver: Arc<dyn Driver>,
}
