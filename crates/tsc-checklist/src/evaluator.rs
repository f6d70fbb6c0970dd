use tsc_ledger::{ObservedState, Reading};
use tsc_schemas::{Address, FeatureFlag, WalletKind};

use crate::names;
use crate::types::{CheckStatus, Checklist, SecurityCheck};

/// Addresses the checks are evaluated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckTargets {
    /// Router the token trades through (from the network profile).
    pub router: Address,
    /// Resolved liquidity pool. `None` skips the pool checks.
    pub pool: Option<Address>,
}

/// Score `state`. Check order is fixed; pool checks only appear when a pool
/// is known.
pub fn evaluate(state: &ObservedState, targets: &CheckTargets) -> Checklist {
    let mut checks = Vec::new();

    let (status, mut detail) = expect(&state.degraded_mode, false);
    if status == CheckStatus::Fail {
        detail = Some(match state.degraded_minutes() {
            Some(m) => format!("degraded mode active for {m} min"),
            None => "degraded mode active".to_string(),
        });
    }
    checks.push(check(names::NOT_DEGRADED, true, (status, detail)));

    checks.push(check(
        names::ROUTER_TAXED,
        true,
        expect(&state.fee_excluded(targets.router), false),
    ));

    if let Some(pool) = targets.pool {
        checks.push(check(
            names::POOL_TAXED,
            true,
            expect(&state.fee_excluded(pool), false),
        ));
    }

    let wallets: Vec<Reading<bool>> = WalletKind::ALL
        .iter()
        .map(|k| state.wallet_binding(*k).map(|a| a != Address::ZERO))
        .collect();
    checks.push(check(names::WALLETS_BOUND, true, all_true(&wallets)));

    checks.push(check(
        names::ANTI_BOT,
        false,
        all_true(&[
            state.feature(FeatureFlag::DumpSpikeDetection),
            state.feature(FeatureFlag::SybilDefense),
        ]),
    ));

    checks.push(check(
        names::BUY_TAX,
        false,
        expect(&state.feature(FeatureFlag::BuyTax), true),
    ));

    checks.push(check(
        names::ROUTER_COOLDOWN_EXEMPT,
        false,
        expect(&state.cooldown_excluded(targets.router), true),
    ));

    if let Some(pool) = targets.pool {
        checks.push(check(
            names::POOL_COOLDOWN_EXEMPT,
            false,
            expect(&state.cooldown_excluded(pool), true),
        ));
    }

    Checklist { checks }
}

fn check(name: &str, critical: bool, (status, detail): (CheckStatus, Option<String>)) -> SecurityCheck {
    SecurityCheck {
        name: name.to_string(),
        status,
        critical,
        detail,
    }
}

fn expect(r: &Reading<bool>, want: bool) -> (CheckStatus, Option<String>) {
    match r {
        Ok(v) if *v == want => (CheckStatus::Pass, None),
        Ok(v) => (CheckStatus::Fail, Some(format!("observed {v}, expected {want}"))),
        Err(e) => (CheckStatus::Unknown, Some(e.to_string())),
    }
}

fn all_true(rs: &[Reading<bool>]) -> (CheckStatus, Option<String>) {
    if let Some(e) = rs.iter().find_map(|r| r.as_ref().err()) {
        return (CheckStatus::Unknown, Some(e.to_string()));
    }
    let ok = rs.iter().all(|r| matches!(r, Ok(true)));
    (CheckStatus::from_bool(ok), None)
}
