/*!
 * Driftguard - anomaly detection and policy enforcement for database
 * change management
 *
 * This crate wires the workspace together for the `driftguard` binary:
 * - TOML configuration with a `[sentinel]` table
 * - Structured logging via tracing
 * - Process errors with exit codes
 * - Fleet snapshots loaded into the in-memory collaborators
 *
 * The policy model lives in `driftguard-core-policy` and the scanner in
 * `driftguard-sentinel`; both are re-exported here.
 */

pub mod config;
pub mod error;
pub mod fleet;
pub mod logging;

// Re-export commonly used types
pub use config::{DriftguardConfig, LogLevel};
pub use error::{DriftguardError, Result};
pub use fleet::FleetSnapshot;

pub use driftguard_core_policy as policy;
pub use driftguard_sentinel as sentinel;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
