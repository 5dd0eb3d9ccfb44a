use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("tierpay"));
    cmd.arg("tests/fixtures/commands.csv")
        .arg("--catalog")
        .arg(common::CATALOG_FIXTURE)
        .arg("--gateway")
        .arg(common::GATEWAY_FIXTURE);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "user,tier,status,price,payment_method,activation_key",
        ))
        // Immediate success
        .stdout(predicate::str::contains("alice,basic,ACTIVE,4.99,pm_ok,pi_ok"))
        // Confirmation then success
        .stdout(predicate::str::contains("bob,pro,ACTIVE,19.9,pm_3ds,pi_3ds"))
        // Nothing settled for the others
        .stdout(predicate::str::contains("carol").not())
        .stdout(predicate::str::contains("dave").not())
        .stdout(predicate::str::contains("erin").not())
        .stdout(predicate::str::contains("frank").not())
        .stderr(predicate::str::contains("[error] Authentication required"))
        .stderr(predicate::str::contains("[error] Temporary processor issue"))
        .stderr(predicate::str::contains("[error] Card declined"))
        .stderr(predicate::str::contains("[error] Error processing payment"))
        .stderr(predicate::str::contains("[success] Payment successful"));

    Ok(())
}

#[test]
fn test_cli_without_gateway_script_charges_everything() {
    let commands = common::commands_file(&[
        "subscribe, alice, basic, pm_anything",
        "subscribe, bob, pro, pm_other",
    ]);

    let mut cmd = Command::new(cargo_bin!("tierpay"));
    cmd.arg(commands.path())
        .arg("--catalog")
        .arg(common::CATALOG_FIXTURE);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("alice,basic,ACTIVE,4.99,pm_anything,pi_"))
        .stdout(predicate::str::contains("bob,pro,ACTIVE,19.9,pm_other,pi_"));
}

#[test]
fn test_cli_requires_catalog() {
    let commands = common::commands_file(&["subscribe, alice, basic, pm_ok"]);

    let mut cmd = Command::new(cargo_bin!("tierpay"));
    cmd.arg(commands.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--catalog"));
}

#[test]
fn test_cli_rejects_unreadable_catalog() {
    let commands = common::commands_file(&["subscribe, alice, basic, pm_ok"]);
    let mut catalog = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut catalog, b"{not json").unwrap();

    let mut cmd = Command::new(cargo_bin!("tierpay"));
    cmd.arg(commands.path()).arg("--catalog").arg(catalog.path());

    cmd.assert().failure();
}
