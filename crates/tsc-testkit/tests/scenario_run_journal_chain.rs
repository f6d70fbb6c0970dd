//! Scenario: persisting runs to the audit journal.
//!
//! # Invariant under test
//! Every run appends a hash-chained block to the same journal file, and the
//! chain verifies across runs. Each phase record of the run lands in the
//! journal in order.

use serde_json::Value;
use tsc_audit::{verify_chain, write_run_report, ChainStatus, Journal};
use tsc_reconcile::{Controller, RunOptions};
use tsc_testkit::{fresh_staging_token, ledger, setup_config};
use uuid::Uuid;

#[tokio::test]
async fn two_runs_chain_into_one_journal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.jsonl");
    let sim = ledger(fresh_staging_token());

    let mut total = 0;
    let mut first_records = 0;
    for _ in 0..2 {
        let run_id = Uuid::new_v4();
        let report = Controller::new(RunOptions {
            run_id,
            honor_safety_delay: false,
        })
        .run(&sim, &setup_config())
        .await
        .unwrap();
        if first_records == 0 {
            first_records = report.records.records.len();
        }

        let mut journal = Journal::open(&path, run_id).unwrap();
        total += write_run_report(&mut journal, &report, Some("cfg-hash")).unwrap();
    }

    assert_eq!(verify_chain(&path).unwrap(), ChainStatus::Intact { entries: total });

    let content = std::fs::read_to_string(&path).unwrap();
    let entries: Vec<Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(entries[0]["kind"], "RUN_START");
    assert_eq!(entries[0]["payload"]["config_hash"], "cfg-hash");
    let phase_records = entries
        .iter()
        .take_while(|e| e["kind"] != "CHECKLIST")
        .filter(|e| e["kind"] == "PHASE_RECORD")
        .count();
    assert_eq!(phase_records, first_records);
    assert_eq!(entries.last().unwrap()["kind"], "VERDICT");
    assert_eq!(entries.last().unwrap()["payload"]["mutations"], 0);
}
