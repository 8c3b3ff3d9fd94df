//! Driftguard Sentinel: anomaly detection for a fleet of managed databases
//!
//! The Sentinel periodically sweeps every active instance of the control
//! plane and keeps the anomaly ledger in step with what it observes: an
//! anomaly is active exactly while its condition holds, and is archived once a
//! later scan finds the condition gone.
//!
//! # Architecture: The Scan Loop
//!
//! ```text
//! ┌─────────────┐
//! │  Load       │──> Environments + backup plan policies (abort on failure)
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Select     │──> Normal instances, normal environment, data source
//! └──────┬──────┘    resolved, not already being scanned
//!        │
//!        v
//! ┌─────────────┐
//! │  Scan       │──> Per database: connectivity → schema drift,
//! └──────┬──────┘    backup policy, missing backup
//!        │
//!        v
//! ┌─────────────┐
//! │  Sleep      │──> scan_interval_s
//! └──────┬──────┘
//!        │
//!        └────> Loop
//! ```
//!
//! # Example
//!
//! ```no_run
//! use driftguard_sentinel::memory::MemoryFleet;
//! use driftguard_sentinel::{Sentinel, SentinelConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let fleet = MemoryFleet::new();
//!
//! let config = SentinelConfig {
//!     scan_interval_s: 600,
//!     max_parallel_scans: 4,
//!     call_timeout_s: Some(30),
//!     ..Default::default()
//! };
//!
//! let sentinel = Sentinel::new(fleet.collaborators(), config)?;
//! sentinel.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod daemon;
pub mod driver;
pub mod error;
pub mod executor;
pub mod gate;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod store;

pub use config::SentinelConfig;
pub use daemon::Sentinel;
pub use driver::{Connection, Driver};
pub use error::{DriverError, SentinelError, StoreError};
pub use executor::ScanExecutor;
pub use gate::{ScanClaim, ScanGate};
pub use metrics::{CheckOutcome, CycleReport, DatabaseScan, InstanceReport};
pub use store::{AnomalyLedger, BackupStore, Collaborators, PolicyStore, TopologyStore};
