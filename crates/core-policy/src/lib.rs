//! Driftguard Core Policy: environment-level change management rules
//!
//! Every environment may carry one policy of each type:
//!
//! | Type                           | Payload                                   | Default                     |
//! |--------------------------------|-------------------------------------------|-----------------------------|
//! | `bb.policy.pipeline-approval`  | `{"value": "MANUAL_APPROVAL_*"}`          | `MANUAL_APPROVAL_ALWAYS`    |
//! | `bb.policy.backup-plan`        | `{"schedule": "UNSET\|DAILY\|WEEKLY"}`    | `UNSET`                     |
//! | `bb.policy.window`             | `{"windowType": 0-2, "windowCron": "…"}`  | unknown type, empty cron    |
//!
//! This crate is pure logic: it decodes, validates and encodes payloads and
//! derives the effective backup cadence of a database. It has no knowledge of
//! where policies are stored.
//!
//! # Example
//!
//! ```
//! use driftguard_core_policy::{validate_policy, PolicyPayload, PolicyType};
//!
//! validate_policy("bb.policy.window", r#"{"windowType":0,"windowCron":"0 2 * * *"}"#).unwrap();
//! assert!(validate_policy("bb.policy.window", r#"{"windowCron":"not-a-cron"}"#).is_err());
//!
//! let plan = PolicyPayload::parse(PolicyType::BackupPlan, "").unwrap();
//! assert_eq!(plan, PolicyPayload::default_for(PolicyType::BackupPlan));
//! ```

pub mod approval;
pub mod backup;
pub mod error;
pub mod policy;
pub mod window;

pub use approval::{ApprovalValue, PipelineApprovalPolicy};
pub use backup::{BackupPlanPolicy, BackupPlanSchedule, BackupSetting, UNSET};
pub use error::PolicyError;
pub use policy::{
    default_payload, default_policy, validate_policy, Policy, PolicyPayload, PolicyType,
    PolicyUpsert, RowStatus,
};
pub use window::{validate_window_cron, WindowPolicy, WindowType};
