//! Scenario: snapshot with failing reads.
//!
//! # Invariant under test
//! A failed query lands in the snapshot as a typed `ReadFailure` for that one
//! field. The rest of the snapshot is still populated, and the reader never
//! returns an error.

use alloy_primitives::address;
use tsc_ledger::{ObservedStateReader, Query, ReadScope};
use tsc_ledger_sim::{Faults, SimLedger, SimState};
use tsc_schemas::{Address, FeatureFlag, WalletKind};

const OWNER: Address = address!("8ba1f109551bD432803012645Ac136ddd64DBA72");
const ROUTER: Address = address!("D99D1c33F9fC3444f8101754aBC46c52416550D1");
const HELPER: Address = address!("824730FE53a434E700D43Ac128264d580b0C105c");

fn ledger() -> SimLedger {
    let mut s = SimState {
        operator: OWNER,
        owner: OWNER,
        router: ROUTER,
        helper: HELPER,
        ..SimState::default()
    };
    s.fee_excluded.insert(HELPER);
    s.features.insert(FeatureFlag::SybilDefense);
    SimLedger::new(s)
}

#[tokio::test]
async fn one_failed_query_does_not_sink_the_snapshot() {
    let mut faults = Faults::default();
    faults.failing_queries.insert("get-degraded-mode".to_string());
    faults.failing_subjects.insert(ROUTER);
    let l = ledger().with_faults(faults);

    let scope = ReadScope {
        exclusion_subjects: vec![ROUTER, HELPER],
        balance_holders: vec![],
    };
    let snap = ObservedStateReader::new(&l).snapshot(&scope).await;

    assert_eq!(snap.owner, Ok(OWNER));
    assert_eq!(snap.helper_binding, Ok(HELPER));
    assert_eq!(snap.fee_excluded(HELPER), Ok(true));
    assert_eq!(snap.feature(FeatureFlag::SybilDefense), Ok(true));
    assert_eq!(snap.wallet_binding(WalletKind::Community), Ok(Address::ZERO));

    assert_eq!(snap.degraded_mode.as_ref().unwrap_err().query, Query::DegradedMode);
    assert_eq!(
        snap.fee_excluded(ROUTER).unwrap_err().query,
        Query::FeeExclusion(ROUTER)
    );
    assert_eq!(
        snap.cooldown_excluded(ROUTER).unwrap_err().query,
        Query::CooldownExclusion(ROUTER)
    );
    assert_eq!(snap.read_failures().len(), 3);
}

#[tokio::test]
async fn snapshot_only_reads_what_it_is_scoped_to() {
    let l = ledger();
    let snap = ObservedStateReader::new(&l)
        .snapshot(&ReadScope::default())
        .await;

    assert!(snap.fee_excluded.is_empty());
    assert!(snap.balances.is_empty());
    assert!(snap.read_failures().is_empty());

    // No mutation was ever issued by the reader.
    assert!(l.submitted().await.is_empty());
}
