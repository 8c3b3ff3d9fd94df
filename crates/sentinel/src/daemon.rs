//! Sentinel Daemon: the anomaly scan loop
//!
//! This module implements the background loop that periodically sweeps every
//! instance of the fleet and reconciles the anomaly ledger with what it finds.

use crate::config::SentinelConfig;
use crate::error::{Result, SentinelError, StoreError};
use crate::executor::{with_timeout, ScanExecutor};
use crate::gate::ScanGate;
use crate::metrics::{CycleReport, CycleReportBuilder, InstanceReport};
use crate::model::{DataSource, Environment, EnvironmentId, Instance, RowStatus};
use crate::store::Collaborators;
use chrono::{DateTime, Utc};
use driftguard_core_policy::BackupPlanPolicy;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// The Sentinel: anomaly scanner for the whole fleet
///
/// Runs an infinite loop:
/// - **Load:** environments and their backup plan policies
/// - **Select:** normal instances in normal environments whose admin data
///   source resolves and that no other scan is holding
/// - **Scan:** every database of each selected instance
/// - **Sleep:** for the configured interval
///
/// A cycle that fails or panics is logged and the loop carries on.
#[derive(Clone)]
pub struct Sentinel {
    collaborators: Collaborators,

    /// Detectors shared by every instance scan
    executor: Arc<ScanExecutor>,

    config: SentinelConfig,

    /// Instances currently being scanned
    gate: ScanGate,

    /// Caps the number of instances scanned at the same time
    scan_semaphore: Arc<Semaphore>,
}

impl Sentinel {
    /// Create a new Sentinel
    ///
    /// Fails with [`SentinelError::Config`] if `config` does not validate.
    pub fn new(collaborators: Collaborators, config: SentinelConfig) -> Result<Self> {
        config.validate().map_err(SentinelError::Config)?;

        let executor = Arc::new(ScanExecutor::new(&collaborators, &config));
        let permits = config.max_parallel_scans;

        Ok(Self {
            collaborators,
            executor,
            config,
            gate: ScanGate::new(),
            scan_semaphore: Arc::new(Semaphore::new(permits)),
        })
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    pub fn gate(&self) -> &ScanGate {
        &self.gate
    }

    /// Spawn the scan loop as a background task
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Main event loop - runs forever
    ///
    /// The interval is measured from the end of one cycle to the start of the
    /// next, so cycles never overlap.
    pub async fn run(self) {
        info!(
            "🛡️  Sentinel Active | Scan Interval: {}s | Max Parallel Scans: {}",
            self.config.scan_interval_s, self.config.max_parallel_scans
        );

        loop {
            self.run_once().await;
            tokio::time::sleep(self.config.scan_interval()).await;
        }
    }

    /// Run one cycle in its own task
    ///
    /// Returns `None` if the cycle was aborted or panicked; either is logged.
    pub async fn run_once(&self) -> Option<CycleReport> {
        let sentinel = self.clone();

        match tokio::spawn(async move { sentinel.run_cycle().await }).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                error!("❌ Scan cycle aborted: {}", e);
                None
            }
            Err(e) if e.is_panic() => {
                error!("💥 Scan cycle panicked: {}", panic_message(e.into_panic()));
                None
            }
            Err(e) => {
                error!("❌ Scan cycle task failed: {}", e);
                None
            }
        }
    }

    /// Execute a single scan cycle
    ///
    /// Failing to load environments, their backup plan policies or the
    /// instance list aborts the cycle before any instance is scanned. Every
    /// later failure is confined to the instance or database it occurred in.
    ///
    /// Note: Public for integration testing
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        info!("🔭 Sentinel: Starting scan cycle...");
        let mut builder = CycleReportBuilder::new();
        let now = Utc::now();
        let limit = self.config.call_timeout();

        let environments = with_timeout(
            limit,
            self.collaborators.topology.list_environments(),
            StoreError::Timeout,
        )
        .await
        .map_err(SentinelError::ListEnvironments)?;

        let mut backup_policies = HashMap::with_capacity(environments.len());
        for environment in &environments {
            let policy = with_timeout(
                limit,
                self.collaborators
                    .policies
                    .get_backup_plan_policy(environment.id),
                StoreError::Timeout,
            )
            .await
            .map_err(|source| SentinelError::BackupPolicy {
                environment: environment.name.clone(),
                source,
            })?;
            backup_policies.insert(environment.id, policy);
        }
        let backup_policies = Arc::new(backup_policies);

        let environments: HashMap<EnvironmentId, Environment> = environments
            .into_iter()
            .map(|environment| (environment.id, environment))
            .collect();

        let instances = with_timeout(
            limit,
            self.collaborators
                .topology
                .list_instances(Some(RowStatus::Normal)),
            StoreError::Timeout,
        )
        .await
        .map_err(SentinelError::ListInstances)?;

        let mut scans = JoinSet::new();

        for mut instance in instances {
            match environments.get(&instance.environment_id) {
                Some(environment) if environment.is_normal() => {
                    instance.environment = Some(environment.clone());
                }
                _ => {
                    debug!(
                        instance = %instance.name,
                        environment_id = instance.environment_id,
                        "Environment is not active, skipping instance"
                    );
                    builder.record_archived();
                    continue;
                }
            }

            let data_source = match with_timeout(
                limit,
                self.collaborators.topology.admin_data_source(&instance),
                StoreError::Timeout,
            )
            .await
            {
                Ok(data_source) => data_source,
                Err(e) => {
                    warn!(
                        instance = %instance.name,
                        error = %e,
                        "Failed to resolve admin data source, skipping instance"
                    );
                    builder.record_unresolved();
                    continue;
                }
            };

            // Wait for a free worker first so that queued instances are not
            // marked as scanning. The semaphore is never closed.
            let permit = self.scan_semaphore.clone().acquire_owned().await.ok();

            let Some(claim) = self.gate.try_claim(instance.id) else {
                debug!(instance = %instance.name, "Instance is already being scanned");
                builder.record_busy();
                continue;
            };

            let sentinel = self.clone();
            let backup_policies = backup_policies.clone();

            scans.spawn(async move {
                let _permit = permit;
                let _claim = claim;
                sentinel
                    .scan_claimed(&instance, &data_source, &backup_policies, now)
                    .await
            });
        }

        while let Some(joined) = scans.join_next().await {
            match joined {
                Ok(report) => builder.record_instance(&report),
                Err(e) => {
                    builder.record_instance_failure();
                    if e.is_panic() {
                        error!(
                            "💥 Instance scan panicked: {}",
                            panic_message(e.into_panic())
                        );
                    } else {
                        error!("❌ Instance scan task failed: {}", e);
                    }
                }
            }
        }

        let report = builder.finish();
        info!("📊 {}", report.summary());

        if report.checks_failed > 0 {
            warn!(
                "⚠️  {} checks failed this cycle ({:.1}% of checks run)",
                report.checks_failed,
                report.failure_ratio() * 100.0
            );
        }

        Ok(report)
    }

    /// Scan every database of one instance
    ///
    /// Returns `None` without doing anything if a scan of the instance is
    /// already running.
    pub async fn scan_instance(
        &self,
        instance: &Instance,
        data_source: &DataSource,
        backup_policies: &HashMap<EnvironmentId, BackupPlanPolicy>,
        now: DateTime<Utc>,
    ) -> Option<InstanceReport> {
        let _claim = self.gate.try_claim(instance.id)?;
        Some(
            self.scan_claimed(instance, data_source, backup_policies, now)
                .await,
        )
    }

    async fn scan_claimed(
        &self,
        instance: &Instance,
        data_source: &DataSource,
        backup_policies: &HashMap<EnvironmentId, BackupPlanPolicy>,
        now: DateTime<Utc>,
    ) -> InstanceReport {
        let mut report = InstanceReport::new(instance.id);

        let databases = match with_timeout(
            self.config.call_timeout(),
            self.collaborators.topology.list_databases(instance.id),
            StoreError::Timeout,
        )
        .await
        {
            Ok(databases) => databases,
            Err(e) => {
                error!(
                    instance = %instance.name,
                    error = %e,
                    "Failed to retrieve database list"
                );
                report.listing_failed = true;
                return report;
            }
        };

        let backup_policy = backup_policies.get(&instance.environment_id);

        for database in &databases {
            let scan = self
                .executor
                .scan_database(instance, data_source, database, backup_policy, now)
                .await;
            report.databases.push(scan);
        }

        debug!(
            instance = %instance.name,
            databases = report.databases.len(),
            "Instance scan complete"
        );

        report
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
