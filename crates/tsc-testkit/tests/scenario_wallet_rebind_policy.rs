//! Scenario: treasury wallet already bound to a different address.
//!
//! # Invariant under test
//! Under the default policy the existing binding is left alone, the conflict
//! is reported, and nothing is disbursed to the unexpected wallet. With
//! `wallet_rebind: overwrite` the binding is replaced. A report carrying the
//! conflict survives a JSON round trip, as the journal stores it.

use tsc_ledger::Mutation;
use tsc_reconcile::{
    Controller, Outcome, Phase, RecoverableFailure, RunOptions, RunReport, Warning,
};
use tsc_schemas::{WalletKind, WalletRebindPolicy};
use tsc_testkit::{converged_staging_token, ledger, setup_config, ADVERTISING, STRANGER};

fn controller() -> Controller {
    Controller::new(RunOptions {
        honor_safety_delay: false,
        ..RunOptions::default()
    })
}

fn conflicted() -> tsc_ledger_sim::SimLedger {
    let mut s = converged_staging_token();
    s.advertising_wallet = STRANGER;
    s.token_balances.remove(&ADVERTISING);
    ledger(s)
}

#[tokio::test]
async fn refuse_leaves_binding_and_skips_funding() {
    let sim = conflicted();
    let report = controller().run(&sim, &setup_config()).await.unwrap();

    assert!(sim.submitted().await.is_empty());
    assert_eq!(sim.state().await.advertising_wallet, STRANGER);
    assert!(report.warnings.contains(&Warning::WalletConflict {
        wallet: WalletKind::Advertising,
        bound: STRANGER,
        desired: ADVERTISING,
    }));

    let wallet_rec = report
        .records
        .for_phase(Phase::WalletBindings)
        .find(|r| r.subject == "advertising_wallet")
        .unwrap();
    assert!(matches!(wallet_rec.outcome, Outcome::Skipped { .. }));
    assert!(report.failures.iter().any(|f| matches!(
        f,
        RecoverableFailure::Funding { wallet: WalletKind::Advertising, reason } if reason.contains("not the configured")
    )));
}

#[tokio::test]
async fn conflict_report_round_trips_through_json() {
    let sim = conflicted();
    let report = controller().run(&sim, &setup_config()).await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    let conflict = json["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["kind"] == "WALLET_CONFLICT")
        .unwrap();
    assert!(conflict.get("wallet").is_some());

    let back: RunReport = serde_json::from_value(json).unwrap();
    assert_eq!(back.warnings, report.warnings);
    assert_eq!(back.failures, report.failures);
    assert_eq!(back.records, report.records);
    assert_eq!(back.verdict, report.verdict);
}

#[tokio::test]
async fn overwrite_rebinds_then_funds() {
    let sim = conflicted();
    let mut cfg = setup_config();
    cfg.policy.wallet_rebind = WalletRebindPolicy::Overwrite;

    let report = controller().run(&sim, &cfg).await.unwrap();

    let submitted = sim.submitted().await;
    assert_eq!(
        submitted[0],
        Mutation::SetWalletBinding {
            kind: WalletKind::Advertising,
            address: ADVERTISING
        }
    );
    assert!(submitted
        .iter()
        .any(|m| matches!(m, Mutation::Disburse { wallet: WalletKind::Advertising, .. })));
    assert_eq!(sim.state().await.advertising_wallet, ADVERTISING);
    assert!(!report
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::WalletConflict { .. })));
}
