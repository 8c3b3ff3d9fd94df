use super::{read, write};
use crate::error::StoreError;
use crate::model::{
    DataSource, Database, Environment, EnvironmentId, Instance, InstanceId, RowStatus,
};
use crate::store::{StoreResult, TopologyStore};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Topology {
    environments: Vec<Environment>,
    instances: Vec<Instance>,
    databases: Vec<Database>,
    data_sources: HashMap<InstanceId, DataSource>,
    failing_listings: HashSet<InstanceId>,
}

/// In-memory environments, instances, databases and admin data sources
#[derive(Debug, Default)]
pub struct MemoryTopology {
    inner: RwLock<Topology>,
}

impl MemoryTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_environment(&self, environment: Environment) {
        write(&self.inner).environments.push(environment);
    }

    pub fn add_instance(&self, instance: Instance) {
        write(&self.inner).instances.push(instance);
    }

    pub fn add_database(&self, database: Database) {
        write(&self.inner).databases.push(database);
    }

    pub fn set_data_source(&self, data_source: DataSource) {
        write(&self.inner)
            .data_sources
            .insert(data_source.instance_id, data_source);
    }

    pub fn set_environment_status(&self, environment_id: EnvironmentId, row_status: RowStatus) {
        let mut inner = write(&self.inner);
        if let Some(environment) = inner
            .environments
            .iter_mut()
            .find(|e| e.id == environment_id)
        {
            environment.row_status = row_status;
        }
    }

    /// Make listing the databases of `instance_id` fail
    pub fn fail_database_listing(&self, instance_id: InstanceId) {
        write(&self.inner).failing_listings.insert(instance_id);
    }
}

#[async_trait]
impl TopologyStore for MemoryTopology {
    async fn list_environments(&self) -> StoreResult<Vec<Environment>> {
        Ok(read(&self.inner).environments.clone())
    }

    async fn list_instances(&self, row_status: Option<RowStatus>) -> StoreResult<Vec<Instance>> {
        Ok(read(&self.inner)
            .instances
            .iter()
            .filter(|i| row_status.map_or(true, |status| i.row_status == status))
            .cloned()
            .collect())
    }

    async fn list_databases(&self, instance_id: InstanceId) -> StoreResult<Vec<Database>> {
        let inner = read(&self.inner);
        if inner.failing_listings.contains(&instance_id) {
            return Err(StoreError::Backend(format!(
                "database listing unavailable for instance {}",
                instance_id
            )));
        }

        Ok(inner
            .databases
            .iter()
            .filter(|d| d.instance_id == instance_id)
            .cloned()
            .collect())
    }

    async fn admin_data_source(&self, instance: &Instance) -> StoreResult<DataSource> {
        read(&self.inner)
            .data_sources
            .get(&instance.id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("admin data source of {}", instance.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: InstanceId, row_status: RowStatus) -> Instance {
        Instance {
            id,
            name: format!("instance-{}", id),
            environment_id: 1,
            row_status,
            environment: None,
        }
    }

    #[tokio::test]
    async fn test_list_instances_filters_status() {
        let topology = MemoryTopology::new();
        topology.add_instance(instance(1, RowStatus::Normal));
        topology.add_instance(instance(2, RowStatus::Archived));

        let normal = topology
            .list_instances(Some(RowStatus::Normal))
            .await
            .unwrap();
        assert_eq!(normal.len(), 1);
        assert_eq!(normal[0].id, 1);

        assert_eq!(topology.list_instances(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_data_source_is_not_found() {
        let topology = MemoryTopology::new();
        let err = topology
            .admin_data_source(&instance(1, RowStatus::Normal))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
