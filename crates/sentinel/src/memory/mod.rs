//! In-memory collaborators
//!
//! Every store and the driver have an implementation backed by plain
//! collections behind `std::sync::RwLock`. They are used by the tests and by
//! the `driftguard scan` command, which loads a fleet snapshot into them.
//!
//! # Example
//!
//! ```rust
//! use driftguard_sentinel::memory::MemoryFleet;
//! use driftguard_sentinel::{Sentinel, SentinelConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fleet = MemoryFleet::new();
//! let sentinel = Sentinel::new(fleet.collaborators(), SentinelConfig::default())?;
//! let report = sentinel.run_cycle().await?;
//! assert_eq!(report.total_instances(), 0);
//! # Ok(())
//! # }
//! ```

mod backup;
mod driver;
mod ledger;
mod policy;
mod topology;

pub use backup::MemoryBackupStore;
pub use driver::{DatabaseState, DriverCounts, InstanceState, MemoryDriver};
pub use ledger::MemoryLedger;
pub use policy::MemoryPolicyStore;
pub use topology::MemoryTopology;

use crate::store::Collaborators;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One handle on each in-memory collaborator
#[derive(Debug, Clone, Default)]
pub struct MemoryFleet {
    pub topology: Arc<MemoryTopology>,
    pub policies: Arc<MemoryPolicyStore>,
    pub backups: Arc<MemoryBackupStore>,
    pub ledger: Arc<MemoryLedger>,
    pub driver: Arc<MemoryDriver>,
}

impl MemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collaborators sharing this fleet's state
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            topology: self.topology.clone(),
            policies: self.policies.clone(),
            backups: self.backups.clone(),
            ledger: self.ledger.clone(),
            driver: self.driver.clone(),
        }
    }
}

// Every critical section leaves the state consistent, so a lock poisoned by a
// panicking reader or writer is still usable.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
