//! Pipeline approval policy

use crate::error::{PolicyError, Result};
use crate::policy::PolicyType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether pipeline execution in an environment is gated on a manual approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApprovalValue {
    #[serde(rename = "MANUAL_APPROVAL_NEVER")]
    ManualNever,

    #[default]
    #[serde(rename = "MANUAL_APPROVAL_ALWAYS")]
    ManualAlways,
}

impl ApprovalValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalValue::ManualNever => "MANUAL_APPROVAL_NEVER",
            ApprovalValue::ManualAlways => "MANUAL_APPROVAL_ALWAYS",
        }
    }
}

impl fmt::Display for ApprovalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalValue {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MANUAL_APPROVAL_NEVER" => Ok(ApprovalValue::ManualNever),
            "MANUAL_APPROVAL_ALWAYS" => Ok(ApprovalValue::ManualAlways),
            other => Err(PolicyError::InvalidValue {
                field: "approval policy value",
                value: other.to_string(),
            }),
        }
    }
}

/// Policy configuration for pipeline approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineApprovalPolicy {
    pub value: ApprovalValue,
}

impl PipelineApprovalPolicy {
    pub fn new(value: ApprovalValue) -> Self {
        Self { value }
    }

    pub fn requires_manual_approval(&self) -> bool {
        self.value == ApprovalValue::ManualAlways
    }

    /// Decode a non-empty payload, checking the enum value by name so an
    /// unknown value is reported as such rather than as a shape error.
    pub(crate) fn decode(payload: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            value: String,
        }

        let raw: Raw = serde_json::from_str(payload).map_err(|source| PolicyError::Malformed {
            policy_type: PolicyType::PipelineApproval,
            payload: payload.to_string(),
            source,
        })?;

        Ok(Self {
            value: raw.value.parse()?,
        })
    }
}
