//! Scenario: phase ordering.
//!
//! # Invariant under test
//! No fee or cooldown exclusion is submitted before the helper binding has
//! been confirmed. Helper and wallet bindings are identity-critical: if either
//! fails, nothing from phase 3 onward is attempted, yet the run still scores
//! the resulting state and reports NOT-READY.

use tsc_checklist::names;
use tsc_ledger::Mutation;
use tsc_ledger_sim::{Faults, SimCall};
use tsc_reconcile::{Controller, Phase, ReconcileError, RunOptions};
use tsc_schemas::WalletKind;
use tsc_testkit::{
    fresh_staging_token, hex, is_exclusion_op, ledger, op_names, setup_config, EXTRA, LENS,
    STRANGER,
};

fn controller() -> Controller {
    Controller::new(RunOptions {
        honor_safety_delay: false,
        ..RunOptions::default()
    })
}

#[tokio::test]
async fn exclusions_follow_confirmed_helper_binding() {
    let sim = ledger(fresh_staging_token());
    controller().run(&sim, &setup_config()).await.unwrap();

    let calls = sim.calls().await;
    let helper_confirmed = calls
        .iter()
        .position(|c| matches!(c, SimCall::Confirm(_)))
        .unwrap();
    let helper_submit = calls
        .iter()
        .position(|c| matches!(c, SimCall::Submit { op: Mutation::SetHelperBinding { .. }, .. }))
        .unwrap();
    let first_exclusion = calls
        .iter()
        .position(|c| matches!(c, SimCall::Submit { op, .. } if is_exclusion_op(op)))
        .unwrap();

    assert!(helper_submit < helper_confirmed);
    assert!(helper_confirmed < first_exclusion);

    let submitted = sim.submitted().await;
    assert_eq!(
        &op_names(&submitted)[..3],
        &["set-helper-binding", "set-wallet-binding", "set-wallet-binding"]
    );
}

#[tokio::test]
async fn exclusion_order_is_independent_of_config_order() {
    let mut forward = setup_config();
    forward.target.additional_exclusions = vec![hex(EXTRA), hex(STRANGER)];
    let mut reversed = setup_config();
    reversed.target.additional_exclusions = vec![hex(STRANGER), hex(EXTRA)];

    let a = ledger(fresh_staging_token());
    controller().run(&a, &forward).await.unwrap();
    let b = ledger(fresh_staging_token());
    controller().run(&b, &reversed).await.unwrap();

    assert_eq!(a.submitted().await, b.submitted().await);
}

#[tokio::test]
async fn helper_revert_aborts_before_any_exclusion() {
    let sim = ledger(fresh_staging_token()).with_faults(Faults {
        reverting_ops: ["set-helper-binding".to_string()].into(),
        ..Faults::default()
    });

    let report = controller().run(&sim, &setup_config()).await.unwrap();

    assert_eq!(op_names(&sim.submitted().await), vec!["set-helper-binding"]);
    match &report.aborted {
        Some(ReconcileError::IdentityBindingFailure { phase, observed, .. }) => {
            assert_eq!(*phase, Phase::HelperBinding);
            assert_eq!(observed.as_deref(), Some("unset"));
        }
        other => panic!("expected identity binding failure, got {other:?}"),
    }
    assert!(!report.checklist.checks.is_empty());
    assert!(!report.verdict.is_ready());
    assert!(report.records.for_phase(Phase::SystemExclusions).next().is_none());
}

#[tokio::test]
async fn wallet_binding_revert_aborts_with_checklist() {
    let sim = ledger(fresh_staging_token()).with_faults(Faults {
        reverting_ops: ["set-wallet-binding".to_string()].into(),
        ..Faults::default()
    });

    let report = controller().run(&sim, &setup_config()).await.unwrap();

    let submitted = sim.submitted().await;
    assert_eq!(
        op_names(&submitted),
        vec!["set-helper-binding", "set-wallet-binding"]
    );
    assert!(matches!(
        submitted[1],
        Mutation::SetWalletBinding { kind: WalletKind::Advertising, .. }
    ));
    assert!(!submitted.iter().any(is_exclusion_op));
    assert!(!sim.state().await.fee_excluded.contains(&LENS));

    assert!(matches!(
        report.aborted,
        Some(ReconcileError::IdentityBindingFailure { phase: Phase::WalletBindings, .. })
    ));
    let wallets = report.checklist.get(names::WALLETS_BOUND).unwrap();
    assert!(!wallets.passed());
    let tsc_checklist::Verdict::NotReady { reasons } = &report.verdict else {
        panic!("expected NOT-READY");
    };
    assert!(reasons.iter().any(|r| r == names::WALLETS_BOUND));
    assert!(reasons.iter().any(|r| r.starts_with("Run aborted:")));
}
