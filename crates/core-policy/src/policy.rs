//! Policy types, the typed payload union, and validation
//!
//! Each environment owns at most one policy per [`PolicyType`]. The payload is
//! persisted as JSON text; an empty payload is legal and means the type's
//! default. [`PolicyPayload`] is the decoded, validated form.

use crate::approval::PipelineApprovalPolicy;
use crate::backup::BackupPlanPolicy;
use crate::error::{PolicyError, Result};
use crate::window::WindowPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The type or name of a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    #[serde(rename = "bb.policy.pipeline-approval")]
    PipelineApproval,
    #[serde(rename = "bb.policy.backup-plan")]
    BackupPlan,
    #[serde(rename = "bb.policy.window")]
    Window,
}

impl PolicyType {
    pub const ALL: [PolicyType; 3] = [
        PolicyType::PipelineApproval,
        PolicyType::BackupPlan,
        PolicyType::Window,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::PipelineApproval => "bb.policy.pipeline-approval",
            PolicyType::BackupPlan => "bb.policy.backup-plan",
            PolicyType::Window => "bb.policy.window",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self> {
        PolicyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PolicyError::UnknownType(s.to_string()))
    }
}

/// A decoded policy payload, one variant per policy type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyPayload {
    Approval(PipelineApprovalPolicy),
    BackupPlan(BackupPlanPolicy),
    Window(WindowPolicy),
}

impl PolicyPayload {
    /// Default used when an environment has no payload for `policy_type`
    pub fn default_for(policy_type: PolicyType) -> Self {
        match policy_type {
            PolicyType::PipelineApproval => {
                PolicyPayload::Approval(PipelineApprovalPolicy::default())
            }
            PolicyType::BackupPlan => PolicyPayload::BackupPlan(BackupPlanPolicy::default()),
            PolicyType::Window => PolicyPayload::Window(WindowPolicy::default()),
        }
    }

    /// Decode and validate a stored payload
    pub fn parse(policy_type: PolicyType, payload: &str) -> Result<Self> {
        if payload.is_empty() {
            return Ok(Self::default_for(policy_type));
        }

        let decoded = match policy_type {
            PolicyType::PipelineApproval => {
                PolicyPayload::Approval(PipelineApprovalPolicy::decode(payload)?)
            }
            PolicyType::BackupPlan => PolicyPayload::BackupPlan(BackupPlanPolicy::decode(payload)?),
            PolicyType::Window => PolicyPayload::Window(WindowPolicy::decode(payload)?),
        };
        decoded.validate()?;

        Ok(decoded)
    }

    pub fn policy_type(&self) -> PolicyType {
        match self {
            PolicyPayload::Approval(_) => PolicyType::PipelineApproval,
            PolicyPayload::BackupPlan(_) => PolicyType::BackupPlan,
            PolicyPayload::Window(_) => PolicyType::Window,
        }
    }

    /// Enum-valued fields are checked by construction; only the window cron
    /// carries a grammar of its own.
    pub fn validate(&self) -> Result<()> {
        match self {
            PolicyPayload::Window(window) => window.validate(),
            PolicyPayload::Approval(_) | PolicyPayload::BackupPlan(_) => Ok(()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let encoded = match self {
            PolicyPayload::Approval(p) => serde_json::to_string(p),
            PolicyPayload::BackupPlan(p) => serde_json::to_string(p),
            PolicyPayload::Window(p) => serde_json::to_string(p),
        };
        encoded.map_err(|source| PolicyError::Encode {
            policy_type: self.policy_type(),
            source,
        })
    }

    pub fn as_approval(&self) -> Option<&PipelineApprovalPolicy> {
        match self {
            PolicyPayload::Approval(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_backup_plan(&self) -> Option<&BackupPlanPolicy> {
        match self {
            PolicyPayload::BackupPlan(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_window(&self) -> Option<&WindowPolicy> {
        match self {
            PolicyPayload::Window(p) => Some(p),
            _ => None,
        }
    }
}

/// Validate a policy type name and its payload text
pub fn validate_policy(policy_type: &str, payload: &str) -> Result<()> {
    let policy_type: PolicyType = policy_type.parse()?;
    PolicyPayload::parse(policy_type, payload).map(|_| ())
}

pub fn default_policy(policy_type: PolicyType) -> PolicyPayload {
    PolicyPayload::default_for(policy_type)
}

/// Default payload text for a policy type
pub fn default_payload(policy_type: PolicyType) -> Result<String> {
    default_policy(policy_type).to_json()
}

/// Row status shared by every persisted control plane record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RowStatus {
    #[default]
    Normal,
    Archived,
}

/// Persisted policy row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: i64,
    #[serde(default)]
    pub row_status: RowStatus,
    pub creator_id: i64,
    pub created_ts: DateTime<Utc>,
    pub updater_id: i64,
    pub updated_ts: DateTime<Utc>,
    pub environment_id: i64,
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    #[serde(default)]
    pub payload: String,
}

impl Policy {
    pub fn decode(&self) -> Result<PolicyPayload> {
        PolicyPayload::parse(self.policy_type, &self.payload)
    }
}

/// Request to create or replace the policy of one (environment, type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpsert {
    pub updater_id: i64,
    pub environment_id: i64,
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    #[serde(default)]
    pub payload: String,
}

impl PolicyUpsert {
    /// Must pass before the payload is persisted
    pub fn validate(&self) -> Result<PolicyPayload> {
        PolicyPayload::parse(self.policy_type, &self.payload)
    }
}
