/*!
 * Fleet snapshots
 *
 * A snapshot is a JSON description of a control plane: environments and
 * their policies, instances with their admin credentials and a simulated
 * driver state, databases, backup settings and backups. Loading a snapshot
 * fills the in-memory collaborators the Sentinel scans.
 */

use crate::error::{DriftguardError, Result};
use driftguard_core_policy::{validate_policy, BackupSetting, PolicyPayload, PolicyType};
use driftguard_sentinel::memory::{InstanceState, MemoryFleet};
use driftguard_sentinel::model::{
    Backup, DataSource, Database, Environment, EnvironmentId, Instance, InstanceId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FleetSnapshot {
    pub environments: Vec<Environment>,
    pub policies: Vec<SnapshotPolicy>,
    pub instances: Vec<SnapshotInstance>,
    pub databases: Vec<Database>,
    pub backup_settings: Vec<BackupSetting>,
    pub backups: Vec<Backup>,
}

/// Policy of one environment, payload as stored by the control plane
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPolicy {
    pub environment_id: EnvironmentId,
    #[serde(rename = "type")]
    pub policy_type: String,
    #[serde(default)]
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInstance {
    #[serde(flatten)]
    pub instance: Instance,

    /// Admin credentials; an instance without them is skipped by every scan
    #[serde(default)]
    pub data_source: Option<SnapshotDataSource>,

    /// What the simulated driver reports for this instance
    #[serde(default)]
    pub state: InstanceState,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDataSource {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for SnapshotDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotDataSource")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl SnapshotDataSource {
    fn for_instance(&self, instance_id: InstanceId) -> DataSource {
        DataSource {
            instance_id,
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

impl FleetSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a snapshot from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| DriftguardError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&contents)
    }

    /// Check references between records and validate every policy
    pub fn validate(&self) -> Result<()> {
        let environments: HashSet<EnvironmentId> =
            self.environments.iter().map(|e| e.id).collect();
        let mut instances = HashSet::new();

        for policy in &self.policies {
            if !environments.contains(&policy.environment_id) {
                return Err(DriftguardError::Snapshot(format!(
                    "policy {} references unknown environment {}",
                    policy.policy_type, policy.environment_id
                )));
            }
            validate_policy(&policy.policy_type, &policy.payload)?;
        }

        for snapshot in &self.instances {
            let instance = &snapshot.instance;
            if !environments.contains(&instance.environment_id) {
                return Err(DriftguardError::Snapshot(format!(
                    "instance {} references unknown environment {}",
                    instance.name, instance.environment_id
                )));
            }
            if !instances.insert(instance.id) {
                return Err(DriftguardError::Snapshot(format!(
                    "duplicate instance id {}",
                    instance.id
                )));
            }
        }

        for database in &self.databases {
            if !instances.contains(&database.instance_id) {
                return Err(DriftguardError::Snapshot(format!(
                    "database {} references unknown instance {}",
                    database.name, database.instance_id
                )));
            }
        }

        Ok(())
    }

    /// Validate the snapshot and load it into a fresh in-memory fleet
    pub fn into_fleet(self) -> Result<MemoryFleet> {
        self.validate()?;
        let fleet = MemoryFleet::new();

        for environment in self.environments {
            fleet.topology.add_environment(environment);
        }

        for policy in self.policies {
            let policy_type: PolicyType = policy.policy_type.parse()?;
            let payload = PolicyPayload::parse(policy_type, &policy.payload)?;
            fleet.policies.set(policy.environment_id, payload);
        }

        for snapshot in self.instances {
            let instance_id = snapshot.instance.id;
            if let Some(data_source) = &snapshot.data_source {
                fleet
                    .topology
                    .set_data_source(data_source.for_instance(instance_id));
            }
            fleet.driver.script(instance_id, snapshot.state);
            fleet.topology.add_instance(snapshot.instance);
        }

        for database in self.databases {
            fleet.topology.add_database(database);
        }

        for setting in self.backup_settings {
            fleet.backups.set_setting(setting);
        }

        for backup in self.backups {
            fleet.backups.add_backup(backup);
        }

        Ok(fleet)
    }
}
