//! Scenario: one address keeps reverting.
//!
//! # Invariant under test
//! A revert on one address in the exclusion phases is recorded against that
//! address and the pipeline continues with the rest. Per-address failures do
//! not change the verdict.

use tsc_ledger_sim::Faults;
use tsc_reconcile::{Controller, Outcome, Phase, RecoverableFailure, RunOptions};
use tsc_testkit::{fresh_staging_token, ledger, setup_config, ADVERTISING, COMMUNITY, EXTRA, HELPER, LENS};

#[tokio::test]
async fn lens_revert_is_isolated() {
    let sim = ledger(fresh_staging_token()).with_faults(Faults {
        reverting_subjects: [LENS].into(),
        ..Faults::default()
    });

    let report = Controller::new(RunOptions {
        honor_safety_delay: false,
        ..RunOptions::default()
    })
    .run(&sim, &setup_config())
    .await
    .unwrap();

    let per_address: Vec<(&str, Phase)> = report
        .failures
        .iter()
        .filter_map(|f| match f {
            RecoverableFailure::PerAddress {
                phase,
                subject,
                address,
                ..
            } => {
                assert_eq!(*address, LENS);
                Some((subject.as_str(), *phase))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        per_address,
        vec![
            ("lens_contract.fee_exclusion", Phase::SystemExclusions),
            ("lens_contract.cooldown_exclusion", Phase::SystemExclusions),
        ]
    );

    let state = sim.state().await;
    for a in [HELPER, ADVERTISING, COMMUNITY, EXTRA] {
        assert!(state.fee_excluded.contains(&a));
        assert!(state.cooldown_excluded.contains(&a));
    }
    assert!(!state.fee_excluded.contains(&LENS));

    let failed = report
        .records
        .records
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
        .count();
    assert_eq!(failed, 2);
    assert!(report.verdict.is_ready());
    // later phases still ran
    assert_eq!(report.records.for_phase(Phase::FeatureActivation).count(), 3);
}
