//! Shared fleet fixture for the Sentinel integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use driftguard_core_policy::{BackupPlanPolicy, BackupPlanSchedule, BackupSetting, PolicyPayload, UNSET};
use driftguard_sentinel::memory::MemoryFleet;
use driftguard_sentinel::model::{
    Backup, BackupStatus, DataSource, Database, DatabaseId, Environment, EnvironmentId, Instance,
    InstanceId, MigrationHistory, RowStatus,
};
use driftguard_sentinel::{Sentinel, SentinelConfig};

pub const PROD: EnvironmentId = 1;
pub const INSTANCE: InstanceId = 10;
pub const DATABASE: DatabaseId = 100;
pub const DB_NAME: &str = "app";

pub const SCHEMA: &str = "CREATE TABLE users (id INT PRIMARY KEY);";
pub const DRIFTED_SCHEMA: &str = "CREATE TABLE users (id INT PRIMARY KEY, email TEXT);";

/// One normal environment with one reachable instance holding one database
/// whose live schema matches its latest migration.
pub struct Fixture {
    pub fleet: MemoryFleet,
}

impl Fixture {
    pub fn new() -> Self {
        let fleet = MemoryFleet::new();
        fleet.topology.add_environment(Environment {
            id: PROD,
            name: "prod".to_string(),
            row_status: RowStatus::Normal,
        });

        let fixture = Self { fleet };
        fixture.add_instance(INSTANCE, PROD, DATABASE);
        fixture
    }

    /// Add a reachable, in-sync instance with a single database named `app`
    pub fn add_instance(
        &self,
        instance_id: InstanceId,
        environment_id: EnvironmentId,
        database_id: DatabaseId,
    ) {
        self.fleet.topology.add_instance(Instance {
            id: instance_id,
            name: format!("mysql-{}", instance_id),
            environment_id,
            row_status: RowStatus::Normal,
            environment: None,
        });
        self.fleet.topology.set_data_source(data_source(instance_id));
        self.fleet.topology.add_database(Database {
            id: database_id,
            instance_id,
            name: DB_NAME.to_string(),
        });

        self.fleet.driver.set_schema(instance_id, DB_NAME, SCHEMA);
        self.fleet.driver.record_migration(
            instance_id,
            DB_NAME,
            MigrationHistory {
                version: "0001".to_string(),
                schema: SCHEMA.to_string(),
            },
        );
    }

    pub fn add_environment(&self, id: EnvironmentId, row_status: RowStatus) {
        self.fleet.topology.add_environment(Environment {
            id,
            name: format!("env-{}", id),
            row_status,
        });
    }

    pub fn require_backups(&self, environment_id: EnvironmentId, schedule: BackupPlanSchedule) {
        self.fleet.policies.set(
            environment_id,
            PolicyPayload::BackupPlan(BackupPlanPolicy::new(schedule)),
        );
    }

    /// Enable automatic backups, daily when `day_of_week` is [`UNSET`]
    pub fn enable_backups(&self, database_id: DatabaseId, day_of_week: i32, updated_ts: DateTime<Utc>) {
        self.fleet.backups.set_setting(BackupSetting {
            database_id,
            enabled: true,
            hour: 2,
            day_of_week,
            updated_ts,
        });
    }

    pub fn enable_daily_backups(&self, database_id: DatabaseId, updated_ts: DateTime<Utc>) {
        self.enable_backups(database_id, UNSET, updated_ts);
    }

    pub fn add_backup(&self, id: i64, database_id: DatabaseId, updated_ts: DateTime<Utc>) {
        self.fleet.backups.add_backup(Backup {
            id,
            database_id,
            status: BackupStatus::Done,
            updated_ts,
        });
    }

    pub fn sentinel(&self) -> Sentinel {
        self.sentinel_with(SentinelConfig::default())
    }

    pub fn sentinel_with(&self, config: SentinelConfig) -> Sentinel {
        Sentinel::new(self.fleet.collaborators(), config).expect("valid config")
    }

    pub fn instance(&self, instance_id: InstanceId) -> Instance {
        Instance {
            id: instance_id,
            name: format!("mysql-{}", instance_id),
            environment_id: PROD,
            row_status: RowStatus::Normal,
            environment: None,
        }
    }
}

pub fn data_source(instance_id: InstanceId) -> DataSource {
    DataSource {
        instance_id,
        host: format!("10.0.0.{}", instance_id),
        port: 3306,
        username: "admin".to_string(),
        password: "secret".to_string(),
    }
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}
