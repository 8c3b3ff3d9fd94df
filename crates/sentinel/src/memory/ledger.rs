use super::{read, write};
use crate::error::StoreError;
use crate::model::{Anomaly, AnomalyType, AnomalyUpsert, DatabaseId, RowStatus};
use crate::store::{AnomalyLedger, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Ledger {
    rows: Vec<Anomaly>,
    next_id: i64,
    unavailable: bool,
}

impl Ledger {
    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::Backend("anomaly ledger unavailable".to_string()));
        }
        Ok(())
    }

    fn find_active_mut(
        &mut self,
        database_id: DatabaseId,
        anomaly_type: AnomalyType,
    ) -> Option<&mut Anomaly> {
        self.rows.iter_mut().find(|a| {
            a.is_active() && a.database_id == database_id && a.anomaly_type == anomaly_type
        })
    }
}

/// In-memory anomaly ledger
///
/// Holds at most one active anomaly per (database, type). Archived rows are
/// kept, so [`MemoryLedger::all`] is the full history.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: RwLock<Ledger>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        write(&self.inner).unavailable = unavailable;
    }

    /// Every row, active and archived, in creation order
    pub fn all(&self) -> Vec<Anomaly> {
        read(&self.inner).rows.clone()
    }

    pub fn active(&self) -> Vec<Anomaly> {
        read(&self.inner)
            .rows
            .iter()
            .filter(|a| a.is_active())
            .cloned()
            .collect()
    }

    pub fn active_for(&self, database_id: DatabaseId) -> Vec<Anomaly> {
        self.active()
            .into_iter()
            .filter(|a| a.database_id == database_id)
            .collect()
    }

    pub fn find_active(&self, database_id: DatabaseId, anomaly_type: AnomalyType) -> Option<Anomaly> {
        read(&self.inner)
            .rows
            .iter()
            .find(|a| a.is_active() && a.database_id == database_id && a.anomaly_type == anomaly_type)
            .cloned()
    }
}

#[async_trait]
impl AnomalyLedger for MemoryLedger {
    async fn upsert_active(&self, upsert: AnomalyUpsert) -> StoreResult<Anomaly> {
        let mut inner = write(&self.inner);
        inner.check_available()?;
        let now = Utc::now();

        if let Some(active) = inner.find_active_mut(upsert.database_id, upsert.anomaly_type) {
            active.creator_id = upsert.creator_id;
            active.instance_id = upsert.instance_id;
            active.payload = upsert.payload;
            active.updated_ts = now;
            return Ok(active.clone());
        }

        inner.next_id += 1;
        let anomaly = Anomaly {
            id: inner.next_id,
            creator_id: upsert.creator_id,
            instance_id: upsert.instance_id,
            database_id: upsert.database_id,
            anomaly_type: upsert.anomaly_type,
            payload: upsert.payload,
            row_status: RowStatus::Normal,
            created_ts: now,
            updated_ts: now,
        };
        inner.rows.push(anomaly.clone());
        Ok(anomaly)
    }

    async fn archive(&self, database_id: DatabaseId, anomaly_type: AnomalyType) -> StoreResult<()> {
        let mut inner = write(&self.inner);
        inner.check_available()?;

        let active = inner
            .find_active_mut(database_id, anomaly_type)
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "active {} anomaly of database {}",
                    anomaly_type, database_id
                ))
            })?;
        active.row_status = RowStatus::Archived;
        active.updated_ts = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(database_id: DatabaseId, anomaly_type: AnomalyType, payload: &str) -> AnomalyUpsert {
        AnomalyUpsert {
            creator_id: 1,
            instance_id: 1,
            database_id,
            anomaly_type,
            payload: payload.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_active_row() {
        let ledger = MemoryLedger::new();

        let first = ledger
            .upsert_active(upsert(1, AnomalyType::DatabaseConnection, r#"{"detail":"a"}"#))
            .await
            .unwrap();
        let second = ledger
            .upsert_active(upsert(1, AnomalyType::DatabaseConnection, r#"{"detail":"b"}"#))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(ledger.all().len(), 1);
        assert_eq!(ledger.active()[0].payload, r#"{"detail":"b"}"#);
    }

    #[tokio::test]
    async fn test_archive_then_reraise_creates_new_row() {
        let ledger = MemoryLedger::new();
        let kind = AnomalyType::DatabaseSchemaDrift;

        ledger.upsert_active(upsert(1, kind, "{}")).await.unwrap();
        ledger.archive(1, kind).await.unwrap();
        assert!(ledger.find_active(1, kind).is_none());
        assert!(ledger.archive(1, kind).await.unwrap_err().is_not_found());

        ledger.upsert_active(upsert(1, kind, "{}")).await.unwrap();
        assert_eq!(ledger.all().len(), 2);
        assert_eq!(ledger.active_for(1).len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_ledger_rejects_writes() {
        let ledger = MemoryLedger::new();
        ledger.set_unavailable(true);

        let err = ledger
            .upsert_active(upsert(1, AnomalyType::DatabaseConnection, "{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));

        ledger.set_unavailable(false);
        assert!(ledger
            .upsert_active(upsert(1, AnomalyType::DatabaseConnection, "{}"))
            .await
            .is_ok());
    }
}
