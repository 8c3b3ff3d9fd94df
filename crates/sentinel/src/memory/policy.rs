use super::{read, write};
use crate::error::StoreError;
use crate::model::EnvironmentId;
use crate::store::{PolicyStore, StoreResult};
use async_trait::async_trait;
use driftguard_core_policy::{
    BackupPlanPolicy, PipelineApprovalPolicy, PolicyError, PolicyPayload, PolicyType,
    PolicyUpsert,
};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Policies {
    payloads: HashMap<(EnvironmentId, PolicyType), PolicyPayload>,
    failing: HashSet<EnvironmentId>,
}

/// In-memory environment policies
///
/// A policy that was never set resolves to its type's default.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    inner: RwLock<Policies>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a policy, replacing the previous one of its type
    pub fn upsert(&self, upsert: &PolicyUpsert) -> Result<PolicyPayload, PolicyError> {
        let payload = upsert.validate()?;
        self.set(upsert.environment_id, payload.clone());
        Ok(payload)
    }

    pub fn set(&self, environment_id: EnvironmentId, payload: PolicyPayload) {
        write(&self.inner)
            .payloads
            .insert((environment_id, payload.policy_type()), payload);
    }

    /// Make every lookup for `environment_id` fail
    pub fn fail_environment(&self, environment_id: EnvironmentId) {
        write(&self.inner).failing.insert(environment_id);
    }

    fn get(&self, environment_id: EnvironmentId, policy_type: PolicyType) -> StoreResult<PolicyPayload> {
        let inner = read(&self.inner);
        if inner.failing.contains(&environment_id) {
            return Err(StoreError::Backend(format!(
                "policy lookup unavailable for environment {}",
                environment_id
            )));
        }

        Ok(inner
            .payloads
            .get(&(environment_id, policy_type))
            .cloned()
            .unwrap_or_else(|| PolicyPayload::default_for(policy_type)))
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn get_backup_plan_policy(
        &self,
        environment_id: EnvironmentId,
    ) -> StoreResult<BackupPlanPolicy> {
        let payload = self.get(environment_id, PolicyType::BackupPlan)?;
        payload
            .as_backup_plan()
            .copied()
            .ok_or_else(|| StoreError::Invalid(format!("{} is not a backup plan", payload.policy_type())))
    }

    async fn get_pipeline_approval_policy(
        &self,
        environment_id: EnvironmentId,
    ) -> StoreResult<PipelineApprovalPolicy> {
        let payload = self.get(environment_id, PolicyType::PipelineApproval)?;
        payload
            .as_approval()
            .copied()
            .ok_or_else(|| StoreError::Invalid(format!("{} is not an approval policy", payload.policy_type())))
    }
}
