/*!
 * Integration tests for scanning a fleet snapshot
 *
 * A snapshot with one healthy database, one drifted database, one
 * unreachable instance and one database overdue for a backup is loaded from
 * disk and scanned; the ledger must hold exactly the expected anomalies.
 */

use driftguard::config::DriftguardConfig;
use driftguard::sentinel::model::AnomalyType;
use driftguard::sentinel::Sentinel;
use driftguard::FleetSnapshot;
use std::fs;
use tempfile::TempDir;

fn snapshot_json() -> String {
    let stale = (chrono::Utc::now() - chrono::Duration::days(3)).to_rfc3339();
    format!(
        r#"{{
        "environments": [
            {{"id": 1, "name": "prod"}},
            {{"id": 2, "name": "legacy", "rowStatus": "ARCHIVED"}}
        ],
        "policies": [
            {{"environmentId": 1, "type": "bb.policy.backup-plan", "payload": "{{\"schedule\":\"WEEKLY\"}}"}},
            {{"environmentId": 1, "type": "bb.policy.window", "payload": "{{\"windowType\":1,\"windowCron\":\"0 9 * * 1-5\"}}"}}
        ],
        "instances": [
            {{
                "id": 10, "name": "mysql-a", "environmentId": 1,
                "dataSource": {{"host": "10.0.0.10", "port": 3306, "username": "admin"}},
                "state": {{"databases": {{
                    "healthy": {{"schema": "S1", "history": [{{"version": "0001", "schema": "S1"}}]}},
                    "drifted": {{"schema": "S2-hotfix", "history": [{{"version": "0007", "schema": "S2"}}]}}
                }}}}
            }},
            {{
                "id": 20, "name": "mysql-b", "environmentId": 1,
                "dataSource": {{"host": "10.0.0.20", "port": 3306, "username": "admin"}},
                "state": {{"unreachable": true}}
            }},
            {{
                "id": 30, "name": "mysql-legacy", "environmentId": 2,
                "dataSource": {{"host": "10.0.0.30", "port": 3306, "username": "admin"}},
                "state": {{"unreachable": true}}
            }}
        ],
        "databases": [
            {{"id": 100, "instanceId": 10, "name": "healthy"}},
            {{"id": 101, "instanceId": 10, "name": "drifted"}},
            {{"id": 200, "instanceId": 20, "name": "orders"}},
            {{"id": 300, "instanceId": 30, "name": "old"}}
        ],
        "backupSettings": [
            {{"databaseId": 100, "enabled": true, "hour": 3, "dayOfWeek": 0, "updatedTs": "{stale}"}},
            {{"databaseId": 101, "enabled": true, "hour": 3, "dayOfWeek": -1, "updatedTs": "{stale}"}}
        ],
        "backups": [
            {{"id": 1, "databaseId": 100, "status": "DONE", "updatedTs": "{stale}"}}
        ]
    }}"#,
        stale = stale
    )
}

#[tokio::test]
async fn test_scan_snapshot_from_disk() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("fleet.json");
    fs::write(&path, snapshot_json())?;

    let fleet = FleetSnapshot::load(&path)?.into_fleet()?;
    let sentinel = Sentinel::new(fleet.collaborators(), Default::default())?;
    let report = sentinel.run_cycle().await?;

    assert_eq!(report.instances_scanned, 2);
    assert_eq!(report.skipped_archived, 1);
    assert_eq!(report.databases_scanned, 3);

    let mut active: Vec<(i64, AnomalyType)> = fleet
        .ledger
        .active()
        .iter()
        .map(|a| (a.database_id, a.anomaly_type))
        .collect();
    active.sort();

    assert_eq!(
        active,
        vec![
            // Drifted schema, daily backups with none taken
            (101, AnomalyType::DatabaseSchemaDrift),
            (101, AnomalyType::DatabaseBackupMissing),
            // Unreachable, and no backup setting under a weekly policy
            (200, AnomalyType::DatabaseConnection),
            (200, AnomalyType::DatabaseBackupPolicyViolation),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_config_file_drives_sentinel() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config_path = dir.path().join("driftguard.toml");
    fs::write(
        &config_path,
        "log_level = \"warn\"\n\n[sentinel]\nmax_parallel_scans = 3\ncall_timeout_s = 10\n",
    )?;

    let config = DriftguardConfig::from_file(&config_path)?;
    config.validate()?;

    let fleet = FleetSnapshot::from_json(&snapshot_json())?.into_fleet()?;
    let sentinel = Sentinel::new(fleet.collaborators(), config.sentinel)?;
    assert_eq!(sentinel.config().max_parallel_scans, 3);

    let report = sentinel.run_cycle().await?;
    assert_eq!(report.instances_scanned, 2);
    assert_eq!(fleet.driver.counts().open, 0);
    Ok(())
}
