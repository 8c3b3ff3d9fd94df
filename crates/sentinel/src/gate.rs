//! Per-instance scan exclusivity
//!
//! The gate is the set of instance ids currently being scanned. A scan may
//! only start after claiming its instance id; the claim is released when the
//! returned [`ScanClaim`] is dropped, on every exit path including unwinding.
//! The lock is only held to insert or remove an id, never across I/O.

use crate::model::InstanceId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct ScanGate {
    scanning: Arc<Mutex<HashSet<InstanceId>>>,
}

impl ScanGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `instance_id`, or `None` if a scan of it is already running
    pub fn try_claim(&self, instance_id: InstanceId) -> Option<ScanClaim> {
        if !self.lock().insert(instance_id) {
            return None;
        }
        Some(ScanClaim {
            gate: self.clone(),
            instance_id,
        })
    }

    pub fn is_scanning(&self, instance_id: InstanceId) -> bool {
        self.lock().contains(&instance_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<InstanceId>> {
        // Critical sections are a single insert or remove, so a poisoned set
        // is still consistent.
        self.scanning.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to scan one instance
#[must_use = "the instance is released as soon as the claim is dropped"]
#[derive(Debug)]
pub struct ScanClaim {
    gate: ScanGate,
    instance_id: InstanceId,
}

impl ScanClaim {
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }
}

impl Drop for ScanClaim {
    fn drop(&mut self) {
        self.gate.lock().remove(&self.instance_id);
    }
}
