//! Error types for the policy model

use crate::policy::PolicyType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("invalid policy type: {0}")]
    UnknownType(String),

    #[error("failed to unmarshal {policy_type} policy {payload:?}: {source}")]
    Malformed {
        policy_type: PolicyType,
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {field} value: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("invalid window cron {cron:?}: {reason}")]
    InvalidCron { cron: String, reason: String },

    #[error("failed to marshal {policy_type} policy: {source}")]
    Encode {
        policy_type: PolicyType,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, PolicyError>;
