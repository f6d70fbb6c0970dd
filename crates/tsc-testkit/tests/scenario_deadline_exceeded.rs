//! Scenario: run deadline.
//!
//! # Invariant under test
//! When the configured deadline expires mid-run the controller returns
//! `DeadlineExceeded`. Effects already confirmed stay on the ledger, and a
//! later run picks up from there.

use std::time::Duration;

use tsc_ledger_sim::Faults;
use tsc_reconcile::{Controller, ReconcileError, RunOptions};
use tsc_testkit::{fresh_staging_token, ledger, setup_config, HELPER};

#[tokio::test]
async fn slow_confirmations_hit_the_deadline() {
    let sim = ledger(fresh_staging_token()).with_faults(Faults {
        confirm_delay_ms: 150,
        ..Faults::default()
    });
    let mut cfg = setup_config();
    cfg.policy.deadline_secs = Some(1);

    let controller = Controller::new(RunOptions {
        honor_safety_delay: false,
        ..RunOptions::default()
    });
    let err = controller.run(&sim, &cfg).await.unwrap_err();
    assert_eq!(
        err,
        ReconcileError::DeadlineExceeded {
            after: Duration::from_secs(1)
        }
    );

    // 20 mutations at 150ms each cannot finish in a second, but the first few did
    let state = sim.state().await;
    assert_eq!(state.helper, HELPER);
    assert!(state.features.is_empty());

    sim.set_faults(Faults::default()).await;
    cfg.policy.deadline_secs = None;
    let report = controller.run(&sim, &cfg).await.unwrap();
    assert!(report.verdict.is_ready());
}
