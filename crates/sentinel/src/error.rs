//! Error types for the Sentinel and the collaborators it consumes

use std::time::Duration;
use thiserror::Error;

/// Failure reported by a control plane store or the anomaly ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Failure reported by a database driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("failed to connect to {instance}: {reason}")]
    Connect { instance: String, reason: String },

    #[error("database {0} not found")]
    NotFound(String),

    #[error("failed to dump schema: {0}")]
    Dump(String),

    #[error("failed to query migration history: {0}")]
    Query(String),

    #[error("driver call timed out after {0:?}")]
    Timeout(Duration),
}

impl DriverError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DriverError::NotFound(_))
    }
}

/// Failure that stops the Sentinel from starting or aborts a whole cycle
#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("invalid sentinel config: {0}")]
    Config(String),

    #[error("failed to retrieve environment list: {0}")]
    ListEnvironments(#[source] StoreError),

    #[error("failed to retrieve backup plan policy for environment {environment}: {source}")]
    BackupPolicy {
        environment: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to retrieve instance list: {0}")]
    ListInstances(#[source] StoreError),
}

pub type Result<T> = std::result::Result<T, SentinelError>;
