//! Records the Sentinel reads from the control plane and the anomaly facts it
//! writes back.

use chrono::{DateTime, Utc};
use driftguard_core_policy::BackupPlanSchedule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use driftguard_core_policy::RowStatus;

pub type EnvironmentId = i64;
pub type InstanceId = i64;
pub type DatabaseId = i64;
pub type PrincipalId = i64;

/// Principal recorded as the creator of every anomaly
pub const SYSTEM_BOT_ID: PrincipalId = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: EnvironmentId,
    pub name: String,
    #[serde(default)]
    pub row_status: RowStatus,
}

impl Environment {
    pub fn is_normal(&self) -> bool {
        self.row_status == RowStatus::Normal
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: InstanceId,
    pub name: String,
    pub environment_id: EnvironmentId,
    #[serde(default)]
    pub row_status: RowStatus,

    /// Attached at scan time, and only when the environment is in normal status
    #[serde(skip)]
    pub environment: Option<Environment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: DatabaseId,
    pub instance_id: InstanceId,
    pub name: String,
}

/// Admin connection info of an instance; no database is selected
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub instance_id: InstanceId,
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("instance_id", &self.instance_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BackupStatus {
    Pending,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub id: i64,
    pub database_id: DatabaseId,
    pub status: BackupStatus,
    pub updated_ts: DateTime<Utc>,
}

/// One entry of a database's migration history, as stored by the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationHistory {
    pub version: String,
    /// Schema dump taken right after the migration was applied
    pub schema: String,
}

/// Kind of condition an anomaly asserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnomalyType {
    #[serde(rename = "bb.anomaly.database.connection")]
    DatabaseConnection,
    #[serde(rename = "bb.anomaly.database.schema.drift")]
    DatabaseSchemaDrift,
    #[serde(rename = "bb.anomaly.database.backup.policy-violation")]
    DatabaseBackupPolicyViolation,
    #[serde(rename = "bb.anomaly.database.backup.missing")]
    DatabaseBackupMissing,
}

impl AnomalyType {
    pub const ALL: [AnomalyType; 4] = [
        AnomalyType::DatabaseConnection,
        AnomalyType::DatabaseSchemaDrift,
        AnomalyType::DatabaseBackupPolicyViolation,
        AnomalyType::DatabaseBackupMissing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::DatabaseConnection => "bb.anomaly.database.connection",
            AnomalyType::DatabaseSchemaDrift => "bb.anomaly.database.schema.drift",
            AnomalyType::DatabaseBackupPolicyViolation => {
                "bb.anomaly.database.backup.policy-violation"
            }
            AnomalyType::DatabaseBackupMissing => "bb.anomaly.database.backup.missing",
        }
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnomalyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("invalid anomaly type: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPayload {
    /// Error reported by the driver when connecting
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDriftPayload {
    /// Version of the latest recorded migration
    pub version: String,
    pub expected_schema: String,
    pub actual_schema: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPolicyViolationPayload {
    pub environment_id: EnvironmentId,
    pub expected_schedule: BackupPlanSchedule,
    pub actual_schedule: BackupPlanSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMissingPayload {
    pub expected_schedule: BackupPlanSchedule,
    /// Completion time of the latest backup, however stale; absent if none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup_ts: Option<DateTime<Utc>>,
}

/// Typed anomaly payload, one variant per [`AnomalyType`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnomalyPayload {
    Connection(ConnectionPayload),
    SchemaDrift(SchemaDriftPayload),
    BackupPolicyViolation(BackupPolicyViolationPayload),
    BackupMissing(BackupMissingPayload),
}

impl AnomalyPayload {
    pub fn anomaly_type(&self) -> AnomalyType {
        match self {
            AnomalyPayload::Connection(_) => AnomalyType::DatabaseConnection,
            AnomalyPayload::SchemaDrift(_) => AnomalyType::DatabaseSchemaDrift,
            AnomalyPayload::BackupPolicyViolation(_) => AnomalyType::DatabaseBackupPolicyViolation,
            AnomalyPayload::BackupMissing(_) => AnomalyType::DatabaseBackupMissing,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            AnomalyPayload::Connection(p) => serde_json::to_string(p),
            AnomalyPayload::SchemaDrift(p) => serde_json::to_string(p),
            AnomalyPayload::BackupPolicyViolation(p) => serde_json::to_string(p),
            AnomalyPayload::BackupMissing(p) => serde_json::to_string(p),
        }
    }

    pub fn decode(anomaly_type: AnomalyType, payload: &str) -> serde_json::Result<Self> {
        Ok(match anomaly_type {
            AnomalyType::DatabaseConnection => {
                AnomalyPayload::Connection(serde_json::from_str(payload)?)
            }
            AnomalyType::DatabaseSchemaDrift => {
                AnomalyPayload::SchemaDrift(serde_json::from_str(payload)?)
            }
            AnomalyType::DatabaseBackupPolicyViolation => {
                AnomalyPayload::BackupPolicyViolation(serde_json::from_str(payload)?)
            }
            AnomalyType::DatabaseBackupMissing => {
                AnomalyPayload::BackupMissing(serde_json::from_str(payload)?)
            }
        })
    }
}

/// A persisted anomaly fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub id: i64,
    pub creator_id: PrincipalId,
    pub instance_id: InstanceId,
    pub database_id: DatabaseId,
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    /// JSON encoding of the matching [`AnomalyPayload`] variant
    pub payload: String,
    pub row_status: RowStatus,
    pub created_ts: DateTime<Utc>,
    pub updated_ts: DateTime<Utc>,
}

impl Anomaly {
    pub fn is_active(&self) -> bool {
        self.row_status == RowStatus::Normal
    }

    pub fn decode_payload(&self) -> serde_json::Result<AnomalyPayload> {
        AnomalyPayload::decode(self.anomaly_type, &self.payload)
    }
}

/// Request to create the active anomaly of a (database, type), or overwrite it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyUpsert {
    pub creator_id: PrincipalId,
    pub instance_id: InstanceId,
    pub database_id: DatabaseId,
    pub anomaly_type: AnomalyType,
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_type_names() {
        for anomaly_type in AnomalyType::ALL {
            assert_eq!(anomaly_type.as_str().parse::<AnomalyType>(), Ok(anomaly_type));
            assert_eq!(
                serde_json::to_string(&anomaly_type).unwrap(),
                format!("\"{}\"", anomaly_type)
            );
        }
        assert!("bb.anomaly.nope".parse::<AnomalyType>().is_err());
    }

    #[test]
    fn test_missing_payload_omits_absent_timestamp() {
        let payload = AnomalyPayload::BackupMissing(BackupMissingPayload {
            expected_schedule: BackupPlanSchedule::Daily,
            last_backup_ts: None,
        });
        assert_eq!(payload.to_json().unwrap(), r#"{"expectedSchedule":"DAILY"}"#);
    }

    #[test]
    fn test_drift_payload_keys() {
        let payload = AnomalyPayload::SchemaDrift(SchemaDriftPayload {
            version: "20240101".to_string(),
            expected_schema: "a".to_string(),
            actual_schema: "b".to_string(),
        });
        let json = payload.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"version":"20240101","expectedSchema":"a","actualSchema":"b"}"#
        );
        assert_eq!(
            AnomalyPayload::decode(AnomalyType::DatabaseSchemaDrift, &json).unwrap(),
            payload
        );
    }

    #[test]
    fn test_data_source_debug_redacts_password() {
        let ds = DataSource {
            instance_id: 1,
            host: "10.0.0.5".to_string(),
            port: 3306,
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", ds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
