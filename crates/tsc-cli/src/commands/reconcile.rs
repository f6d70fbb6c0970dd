//! `tsc reconcile`: one run against a simulated ledger loaded from JSON.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use tsc_audit::{write_run_failure, write_run_report, Journal};
use tsc_config::{report_unused_keys, resolve_profile, UnusedKeyPolicy};
use tsc_ledger_sim::{SimLedger, SimState};
use tsc_reconcile::{Controller, Outcome, RunOptions, RunReport};
use uuid::Uuid;

use super::{load_setup, print_profile};

pub struct ReconcileArgs {
    pub config_paths: Vec<String>,
    pub ledger_state: String,
    pub write_state: bool,
    pub audit_dir: Option<String>,
    pub honor_safety_delay: bool,
}

pub async fn run(args: ReconcileArgs) -> Result<()> {
    let (loaded, setup) = load_setup(&args.config_paths)?;
    let state = SimState::load_json(&args.ledger_state)?;

    // stray keys are a hard error where mistakes cost real funds
    let policy = if resolve_profile(state.network_id).kind.is_primary() {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let unused = report_unused_keys(&loaded.config_json, policy)?;
    for ptr in &unused.unused_leaf_pointers {
        tracing::warn!(pointer = %ptr, "unused config key");
    }

    let run_id = Uuid::new_v4();
    let mut journal = match &args.audit_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("create audit dir failed: {dir}"))?;
            Some(Journal::open(Path::new(dir).join("journal.jsonl"), run_id)?)
        }
        None => None,
    };

    let ledger = SimLedger::new(state);
    let controller = Controller::new(RunOptions {
        run_id,
        honor_safety_delay: args.honor_safety_delay,
    });

    println!("run_id={run_id}");
    println!("config_hash={}", loaded.config_hash);

    let report = match controller.run(&ledger, &setup).await {
        Ok(r) => r,
        Err(e) => {
            if let Some(j) = journal.as_mut() {
                write_run_failure(j, &e, Some(&loaded.config_hash))?;
                println!("journal_path={}", j.path().display());
            }
            return Err(anyhow::Error::new(e).context("reconcile run failed"));
        }
    };

    print_report(&report);

    if let Some(j) = journal.as_mut() {
        let n = write_run_report(j, &report, Some(&loaded.config_hash))?;
        println!("journal_path={} entries_written={n}", j.path().display());
    }

    if args.write_state {
        ledger.state().await.write_json(&args.ledger_state)?;
        info!(path = %args.ledger_state, "ledger state written");
    }

    if !report.verdict.is_ready() {
        anyhow::bail!("verdict NOT-READY for run {run_id}");
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    print_profile(&report.profile);
    println!(
        "pool={}",
        report
            .pool
            .map(|p| p.to_checksum(None))
            .unwrap_or_else(|| "none".to_string())
    );

    for r in &report.records.records {
        let outcome = match &r.outcome {
            Outcome::Confirmed => "CONFIRMED".to_string(),
            Outcome::AlreadyConfigured => "ALREADY_CONFIGURED".to_string(),
            Outcome::Skipped { reason } => format!("SKIPPED reason=\"{reason}\""),
            Outcome::Failed { reason } => format!("FAILED reason=\"{reason}\""),
        };
        let action = r
            .action
            .as_ref()
            .map(|m| format!(" action={m}"))
            .unwrap_or_default();
        println!(
            "record phase={} subject={}{action} before={} after={} outcome={outcome}",
            r.phase,
            r.subject,
            r.before.as_deref().unwrap_or("-"),
            r.after.as_deref().unwrap_or("-"),
        );
    }
    for w in &report.warnings {
        println!("warning {w}");
    }
    for f in &report.failures {
        println!("failure {f}");
    }
    if let Some(e) = &report.aborted {
        println!("aborted {e}");
    }

    for c in &report.checklist.checks {
        let detail = c
            .detail
            .as_deref()
            .map(|d| format!(" detail=\"{d}\""))
            .unwrap_or_default();
        println!(
            "check status={} critical={} name=\"{}\"{detail}",
            c.status.as_str(),
            c.critical,
            c.name
        );
    }
    for a in &report.advisories {
        println!("next {a}");
    }
    println!("mutations={}", report.mutation_count());
    println!("verdict={}", report.verdict);
}
