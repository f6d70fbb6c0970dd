//! Scenario: `tsc reconcile` end to end against a ledger state file.
//!
//! A fresh token converges in one run, the converged state is written back,
//! a second run issues nothing, and the journal both runs appended verifies.
//! A token the operator does not own exits non-zero with NOT-READY.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;
use tsc_testkit::{fresh_staging_token, fresh_token, STRANGER};

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .to_string()
}

fn reconcile(state: &str, audit_dir: &str) -> Command {
    let mut cmd = Command::cargo_bin("tsc").unwrap();
    cmd.args([
        "reconcile",
        "--config",
        &fixture("setup.yaml"),
        "--ledger-state",
        state,
        "--audit-dir",
        audit_dir,
        "--write-state",
        "--no-safety-delay",
    ]);
    cmd
}

#[test]
fn fresh_token_converges_then_reruns_clean() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("ledger.json");
    let audit = dir.path().join("audit");
    fresh_staging_token().write_json(&state).unwrap();
    let state_s = state.to_string_lossy().to_string();
    let audit_s = audit.to_string_lossy().to_string();

    reconcile(&state_s, &audit_s)
        .assert()
        .success()
        .stdout(predicate::str::contains("profile=STAGING"))
        .stdout(predicate::str::contains(
            "record phase=1:helper_binding subject=helper_contract",
        ))
        .stdout(predicate::str::contains("mutations=20"))
        .stdout(predicate::str::contains("verdict=READY"));

    reconcile(&state_s, &audit_s)
        .assert()
        .success()
        .stdout(predicate::str::contains("mutations=0"))
        .stdout(predicate::str::contains("verdict=READY"));

    let journal = audit.join("journal.jsonl");
    Command::cargo_bin("tsc")
        .unwrap()
        .args(["audit", "verify", "--path", &journal.to_string_lossy()])
        .assert()
        .success()
        .stdout(predicate::str::contains("chain=INTACT"));
}

#[test]
fn foreign_token_is_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("ledger.json");
    let mut s = fresh_staging_token();
    s.owner = STRANGER;
    s.write_json(&state).unwrap();

    reconcile(&state.to_string_lossy(), &dir.path().join("audit").to_string_lossy())
        .assert()
        .failure()
        .stdout(predicate::str::contains("mutations=0"))
        .stdout(predicate::str::contains("verdict=NOT-READY"))
        .stdout(predicate::str::contains("aborted preflight failed"));
}

#[test]
fn stray_key_is_fatal_on_primary() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("ledger.json");
    fresh_token(56).write_json(&state).unwrap();

    Command::cargo_bin("tsc")
        .unwrap()
        .args([
            "reconcile",
            "--config",
            &fixture("setup.yaml"),
            "--config",
            &fixture("stray_key.yaml"),
            "--ledger-state",
            &state.to_string_lossy(),
            "--no-safety-delay",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"));
}

#[test]
fn tampered_journal_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("ledger.json");
    let audit = dir.path().join("audit");
    fresh_staging_token().write_json(&state).unwrap();
    reconcile(&state.to_string_lossy(), &audit.to_string_lossy())
        .assert()
        .success();

    let journal = audit.join("journal.jsonl");
    let content = std::fs::read_to_string(&journal).unwrap();
    std::fs::write(&journal, content.replacen("CONFIRMED", "FAILED", 1)).unwrap();

    Command::cargo_bin("tsc")
        .unwrap()
        .args(["audit", "verify", "--path", &journal.to_string_lossy()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("chain=BROKEN"));
}
