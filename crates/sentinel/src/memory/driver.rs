use super::{read, write};
use crate::driver::{Connection, Driver, DriverResult};
use crate::error::DriverError;
use crate::model::{DataSource, InstanceId, MigrationHistory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Scripted state of one database on a simulated instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseState {
    /// Live schema returned by a schema dump
    pub schema: String,

    /// Make the schema dump fail with this message
    pub dump_error: Option<String>,

    /// Migration history, most recent first
    pub history: Vec<MigrationHistory>,

    /// Make reading the migration history fail with this message
    pub history_error: Option<String>,
}

/// Scripted state of one simulated instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceState {
    /// Refuse every connection
    pub unreachable: bool,

    /// Time a connection attempt takes
    pub connect_delay_ms: u64,

    /// Databases that exist on the instance, by name
    pub databases: HashMap<String, DatabaseState>,
}

/// Snapshot of the calls made to a [`MemoryDriver`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverCounts {
    pub connects: usize,
    pub dumps: usize,
    pub history_reads: usize,
    pub closes: usize,

    /// Connections opened and not yet closed
    pub open: usize,
}

#[derive(Debug, Default)]
struct Counters {
    connects: AtomicUsize,
    dumps: AtomicUsize,
    history_reads: AtomicUsize,
    closes: AtomicUsize,
    open: AtomicUsize,
}

/// Simulated database driver
///
/// Instances that were never scripted refuse connections.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    instances: RwLock<HashMap<InstanceId, InstanceState>>,
    counters: Arc<Counters>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole state of an instance
    pub fn script(&self, instance_id: InstanceId, state: InstanceState) {
        write(&self.instances).insert(instance_id, state);
    }

    pub fn set_unreachable(&self, instance_id: InstanceId, unreachable: bool) {
        write(&self.instances)
            .entry(instance_id)
            .or_default()
            .unreachable = unreachable;
    }

    pub fn set_connect_delay(&self, instance_id: InstanceId, delay: Duration) {
        write(&self.instances)
            .entry(instance_id)
            .or_default()
            .connect_delay_ms = delay.as_millis() as u64;
    }

    /// Set the state of one database, creating it if needed
    pub fn set_database(&self, instance_id: InstanceId, name: &str, state: DatabaseState) {
        write(&self.instances)
            .entry(instance_id)
            .or_default()
            .databases
            .insert(name.to_string(), state);
    }

    /// Change the live schema of a database, as an out-of-band change would
    pub fn set_schema(&self, instance_id: InstanceId, name: &str, schema: &str) {
        write(&self.instances)
            .entry(instance_id)
            .or_default()
            .databases
            .entry(name.to_string())
            .or_default()
            .schema = schema.to_string();
    }

    /// Record a migration as the latest entry of the database's history
    pub fn record_migration(&self, instance_id: InstanceId, name: &str, migration: MigrationHistory) {
        write(&self.instances)
            .entry(instance_id)
            .or_default()
            .databases
            .entry(name.to_string())
            .or_default()
            .history
            .insert(0, migration);
    }

    pub fn drop_database(&self, instance_id: InstanceId, name: &str) {
        if let Some(instance) = write(&self.instances).get_mut(&instance_id) {
            instance.databases.remove(name);
        }
    }

    pub fn counts(&self) -> DriverCounts {
        DriverCounts {
            connects: self.counters.connects.load(Ordering::SeqCst),
            dumps: self.counters.dumps.load(Ordering::SeqCst),
            history_reads: self.counters.history_reads.load(Ordering::SeqCst),
            closes: self.counters.closes.load(Ordering::SeqCst),
            open: self.counters.open.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn connect(&self, data_source: &DataSource) -> DriverResult<Box<dyn Connection>> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        let instance = format!("{}:{}", data_source.host, data_source.port);

        let delay = read(&self.instances)
            .get(&data_source.instance_id)
            .map(|state| state.connect_delay_ms)
            .unwrap_or_default();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        // Read the state after the delay so the connection sees the latest script
        let state = match read(&self.instances).get(&data_source.instance_id) {
            Some(state) if !state.unreachable => state.clone(),
            Some(_) => {
                return Err(DriverError::Connect {
                    instance,
                    reason: "connection refused".to_string(),
                })
            }
            None => {
                return Err(DriverError::Connect {
                    instance,
                    reason: "no such host".to_string(),
                })
            }
        };

        self.counters.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            state,
            counters: self.counters.clone(),
        }))
    }
}

struct MemoryConnection {
    state: InstanceState,
    counters: Arc<Counters>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn dump_schema_only(&self, database: &str) -> DriverResult<String> {
        self.counters.dumps.fetch_add(1, Ordering::SeqCst);

        let db = self
            .state
            .databases
            .get(database)
            .ok_or_else(|| DriverError::NotFound(database.to_string()))?;
        if let Some(e) = &db.dump_error {
            return Err(DriverError::Dump(e.clone()));
        }
        Ok(db.schema.clone())
    }

    async fn find_migration_history(
        &self,
        database: &str,
        limit: usize,
    ) -> DriverResult<Vec<MigrationHistory>> {
        self.counters.history_reads.fetch_add(1, Ordering::SeqCst);

        let Some(db) = self.state.databases.get(database) else {
            return Ok(Vec::new());
        };
        if let Some(e) = &db.history_error {
            return Err(DriverError::Query(e.clone()));
        }
        Ok(db.history.iter().take(limit).cloned().collect())
    }

    async fn close(&self) -> DriverResult<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.counters.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_source(instance_id: InstanceId) -> DataSource {
        DataSource {
            instance_id,
            host: "127.0.0.1".to_string(),
            port: 3306,
            username: "root".to_string(),
            password: String::new(),
        }
    }

    #[tokio::test]
    async fn test_unscripted_instance_refuses() {
        let driver = MemoryDriver::new();
        let err = driver.connect(&data_source(1)).await.err().unwrap();
        assert!(matches!(err, DriverError::Connect { .. }));
        assert_eq!(driver.counts().open, 0);
    }

    #[tokio::test]
    async fn test_scripted_database() {
        let driver = MemoryDriver::new();
        driver.set_schema(1, "app", "CREATE TABLE t (id INT);");
        driver.record_migration(
            1,
            "app",
            MigrationHistory {
                version: "0001".to_string(),
                schema: "CREATE TABLE t (id INT);".to_string(),
            },
        );

        let conn = driver.connect(&data_source(1)).await.unwrap();
        assert_eq!(conn.dump_schema_only("app").await.unwrap(), "CREATE TABLE t (id INT);");
        assert!(conn.dump_schema_only("gone").await.unwrap_err().is_not_found());
        assert_eq!(conn.find_migration_history("app", 1).await.unwrap().len(), 1);
        assert_eq!(driver.counts().open, 1);

        conn.close().await.unwrap();
        let counts = driver.counts();
        assert_eq!(counts.open, 0);
        assert_eq!(counts.dumps, 2);
        assert_eq!(counts.closes, 1);
    }

    #[test]
    fn test_instance_state_from_json() {
        let state: InstanceState = serde_json::from_str(
            r#"{"unreachable": false, "databases": {"app": {"schema": "x", "history": [{"version": "1", "schema": "x"}]}}}"#,
        )
        .unwrap();
        assert_eq!(state.connect_delay_ms, 0);
        assert_eq!(state.databases["app"].history[0].version, "1");
    }
}
