//! Scenario: offline commands.
//!
//! `tsc validate` reports every bad address and exits non-zero without any
//! ledger. `tsc profile` resolves network ids exactly and falls back for
//! anything unknown.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .to_string()
}

#[test]
fn valid_config_passes() {
    Command::cargo_bin("tsc")
        .unwrap()
        .args(["validate", "--config", &fixture("setup.yaml")])
        .assert()
        .success()
        .stdout(predicate::str::contains("addresses_ok=true checked=5"));
}

#[test]
fn unfilled_placeholder_fails() {
    Command::cargo_bin("tsc")
        .unwrap()
        .args([
            "validate",
            "--config",
            &fixture("setup.yaml"),
            "--config",
            &fixture("unfilled_helper.yaml"),
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "invalid label=target.helper_contract kind=Placeholder",
        ))
        .stderr(predicate::str::contains("1 invalid address(es)"));
}

#[test]
fn primary_profile_is_resolved() {
    Command::cargo_bin("tsc")
        .unwrap()
        .args(["profile", "--network-id", "56"])
        .assert()
        .success()
        .stdout(predicate::str::contains("profile=PRIMARY network_id=56"))
        .stdout(predicate::str::contains(
            "router=0x10ED43C718714eb63d5aA57B78B54704E256024E",
        ))
        .stdout(predicate::str::contains("safety_delay_ms=3000"));
}

#[test]
fn unknown_network_falls_back() {
    Command::cargo_bin("tsc")
        .unwrap()
        .args(["profile", "--network-id", "31337"])
        .assert()
        .success()
        .stdout(predicate::str::contains("profile=FALLBACK network_id=31337"))
        .stdout(predicate::str::contains("gas_ceiling_per_operation=default"));
}

#[test]
fn config_hash_is_stable() {
    let run = || {
        Command::cargo_bin("tsc")
            .unwrap()
            .args(["config-hash", &fixture("setup.yaml")])
            .output()
            .unwrap()
    };
    let a = run();
    let b = run();
    assert!(a.status.success());
    assert_eq!(a.stdout, b.stdout);
    assert!(String::from_utf8_lossy(&a.stdout).starts_with("config_hash="));
}
