use super::{read, write};
use crate::error::StoreError;
use crate::model::{Backup, BackupStatus, DatabaseId};
use crate::store::{BackupStore, StoreResult};
use async_trait::async_trait;
use driftguard_core_policy::BackupSetting;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Backups {
    settings: HashMap<DatabaseId, BackupSetting>,
    backups: Vec<Backup>,
    failing_settings: HashSet<DatabaseId>,
    failing_backups: HashSet<DatabaseId>,
}

/// In-memory backup settings and backup records
#[derive(Debug, Default)]
pub struct MemoryBackupStore {
    inner: RwLock<Backups>,
}

impl MemoryBackupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_setting(&self, setting: BackupSetting) {
        write(&self.inner)
            .settings
            .insert(setting.database_id, setting);
    }

    pub fn add_backup(&self, backup: Backup) {
        write(&self.inner).backups.push(backup);
    }

    /// Make reading the backup setting of `database_id` fail
    pub fn fail_setting(&self, database_id: DatabaseId) {
        write(&self.inner).failing_settings.insert(database_id);
    }

    /// Make listing the backups of `database_id` fail
    pub fn fail_backups(&self, database_id: DatabaseId) {
        write(&self.inner).failing_backups.insert(database_id);
    }
}

#[async_trait]
impl BackupStore for MemoryBackupStore {
    async fn find_backup_setting(&self, database_id: DatabaseId) -> StoreResult<BackupSetting> {
        let inner = read(&self.inner);
        if inner.failing_settings.contains(&database_id) {
            return Err(StoreError::Backend(format!(
                "backup setting unavailable for database {}",
                database_id
            )));
        }

        inner
            .settings
            .get(&database_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("backup setting of database {}", database_id)))
    }

    async fn find_backups(
        &self,
        database_id: DatabaseId,
        status: BackupStatus,
    ) -> StoreResult<Vec<Backup>> {
        let inner = read(&self.inner);
        if inner.failing_backups.contains(&database_id) {
            return Err(StoreError::Backend(format!(
                "backup list unavailable for database {}",
                database_id
            )));
        }

        let mut backups: Vec<Backup> = inner
            .backups
            .iter()
            .filter(|b| b.database_id == database_id && b.status == status)
            .cloned()
            .collect();
        backups.sort_by(|a, b| b.updated_ts.cmp(&a.updated_ts));
        Ok(backups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_find_backups_most_recent_first() {
        let store = MemoryBackupStore::new();
        let now = Utc::now();

        for (id, age_h, status) in [
            (1, 48, BackupStatus::Done),
            (2, 2, BackupStatus::Done),
            (3, 1, BackupStatus::Failed),
            (4, 24, BackupStatus::Done),
        ] {
            store.add_backup(Backup {
                id,
                database_id: 7,
                status,
                updated_ts: now - Duration::hours(age_h),
            });
        }

        let done = store.find_backups(7, BackupStatus::Done).await.unwrap();
        let ids: Vec<i64> = done.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 4, 1]);

        assert!(store.find_backups(8, BackupStatus::Done).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_setting_is_not_found() {
        let store = MemoryBackupStore::new();
        assert!(store.find_backup_setting(1).await.unwrap_err().is_not_found());

        store.fail_setting(2);
        assert!(!store.find_backup_setting(2).await.unwrap_err().is_not_found());
    }
}
