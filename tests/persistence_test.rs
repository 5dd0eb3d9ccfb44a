#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: subscribe
    let commands1 = common::commands_file(&["subscribe, alice, basic, pm_ok"]);
    let output1 = Command::new(cargo_bin!("tierpay"))
        .arg(commands1.path())
        .arg("--catalog")
        .arg(common::CATALOG_FIXTURE)
        .arg("--gateway")
        .arg(common::GATEWAY_FIXTURE)
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("alice,basic,ACTIVE,4.99,pm_ok,pi_ok"));

    // 2. Second run against the same DB: cancel what the first run created
    let commands2 = common::commands_file(&["cancel, alice, basic,"]);
    let output2 = Command::new(cargo_bin!("tierpay"))
        .arg(commands2.path())
        .arg("--catalog")
        .arg(common::CATALOG_FIXTURE)
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("alice,basic,PENDING_CANCELLATION,4.99,pm_ok,pi_ok"));
}
