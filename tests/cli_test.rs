/*!
 * End-to-end tests of the driftguard binary
 */

use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn driftguard() -> Command {
    Command::new(env!("CARGO_BIN_EXE_driftguard"))
}

#[test]
fn test_policy_validate_accepts_valid_window() {
    let output = driftguard()
        .args([
            "policy",
            "validate",
            "--type",
            "bb.policy.window",
            "--payload",
            r#"{"windowType":0,"windowCron":"30 2 * * 6"}"#,
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("30 2 * * 6"));
}

#[test]
fn test_policy_validate_rejects_bad_cron() {
    let output = driftguard()
        .args([
            "policy",
            "validate",
            "--type",
            "bb.policy.window",
            "--payload",
            r#"{"windowCron":"not-a-cron"}"#,
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not-a-cron"));
}

#[test]
fn test_policy_validate_rejects_unknown_type() {
    let output = driftguard()
        .args(["policy", "validate", "--type", "bb.policy.nope"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_policy_default() {
    let output = driftguard()
        .args(["policy", "default", "--type", "bb.policy.backup-plan"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        r#"{"schedule":"UNSET"}"#
    );
}

#[test]
fn test_scan_once_prints_active_anomalies() {
    let dir = TempDir::new().unwrap();
    let fleet = dir.path().join("fleet.json");
    fs::write(
        &fleet,
        r#"{
            "environments": [{"id": 1, "name": "prod"}],
            "instances": [{
                "id": 10, "name": "mysql-a", "environmentId": 1,
                "dataSource": {"host": "10.0.0.10", "port": 3306, "username": "admin"},
                "state": {"unreachable": true}
            }],
            "databases": [{"id": 100, "instanceId": 10, "name": "app"}]
        }"#,
    )
    .unwrap();
    let log = dir.path().join("driftguard.log");

    let output = driftguard()
        .args(["scan", "--once", "--fleet"])
        .arg(&fleet)
        .arg("--log")
        .arg(&log)
        .output()
        .unwrap();

    assert!(output.status.success());
    let anomalies: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let anomalies = anomalies.as_array().unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0]["type"], "bb.anomaly.database.connection");
    assert_eq!(anomalies[0]["databaseId"], 100);

    // Logs went to the file, not stdout
    assert!(fs::read_to_string(&log).unwrap().contains("Starting scan cycle"));
}

#[test]
fn test_scan_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let fleet = dir.path().join("fleet.json");
    fs::write(&fleet, "{}").unwrap();

    let output = driftguard()
        .args(["scan", "--once", "--workers", "0", "--fleet"])
        .arg(&fleet)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_scan_missing_snapshot() {
    let output = driftguard()
        .args(["scan", "--once", "--fleet", "/nonexistent/fleet.json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}
