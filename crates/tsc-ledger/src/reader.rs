//! Concurrent read side.
//!
//! Snapshot reads have no ordering dependency on each other, so they are all
//! issued at once and joined. A failed read lands in the snapshot as a
//! [`ReadFailure`]; the reader itself never fails.

use std::collections::BTreeMap;

use chrono::Utc;
use futures_util::future::join_all;
use futures_util::join;
use tracing::{debug, warn};
use tsc_schemas::{Address, FeatureFlag, WalletKind, U256};

use crate::{Ledger, LedgerError, ObservedState, Query, ReadFailure, Reading};

/// Which per-address fields a snapshot covers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadScope {
    /// Addresses whose fee and cooldown exclusion flags are read.
    pub exclusion_subjects: Vec<Address>,
    /// Addresses whose token balance is read.
    pub balance_holders: Vec<Address>,
}

pub struct ObservedStateReader<'a, L: Ledger + ?Sized> {
    ledger: &'a L,
}

fn reading<T>(query: Query, r: Result<T, LedgerError>) -> Reading<T> {
    r.map_err(|e| {
        warn!(query = %query, error = %e, "ledger read failed");
        ReadFailure::new(query, &e)
    })
}

impl<'a, L: Ledger + ?Sized> ObservedStateReader<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// Full snapshot. Scalar fields always; per-address fields per `scope`.
    pub async fn snapshot(&self, scope: &ReadScope) -> ObservedState {
        let l = self.ledger;

        let (
            owner,
            name,
            symbol,
            total_supply,
            helper_binding,
            liquidity_pool,
            router,
            degraded_mode,
            degraded_mode_activated_at,
            setup_completed,
            trading_enabled,
        ) = join!(
            l.owner(),
            l.name(),
            l.symbol(),
            l.total_supply(),
            l.helper_binding(),
            l.liquidity_pool(),
            l.router(),
            l.degraded_mode(),
            l.degraded_mode_activated_at(),
            l.setup_completed(),
            l.trading_enabled(),
        );

        let (wallets, features, exclusions, balances) = join!(
            join_all(WalletKind::ALL.map(|k| async move { (k, self.wallet_binding(k).await) })),
            join_all(FeatureFlag::ALL.map(|f| async move { (f, self.feature(f).await) })),
            join_all(scope.exclusion_subjects.iter().map(|a| async move {
                let (fee, cooldown) = join!(self.fee_excluded(*a), self.cooldown_excluded(*a));
                (*a, fee, cooldown)
            })),
            join_all(
                scope
                    .balance_holders
                    .iter()
                    .map(|a| async move { (*a, self.balance_of(*a).await) })
            ),
        );

        let mut fee_excluded = BTreeMap::new();
        let mut cooldown_excluded = BTreeMap::new();
        for (a, fee, cooldown) in exclusions {
            fee_excluded.insert(a, fee);
            cooldown_excluded.insert(a, cooldown);
        }

        let state = ObservedState {
            captured_at: Utc::now(),
            owner: reading(Query::Owner, owner),
            name: reading(Query::Name, name),
            symbol: reading(Query::Symbol, symbol),
            total_supply: reading(Query::TotalSupply, total_supply),
            helper_binding: reading(Query::HelperBinding, helper_binding),
            wallet_bindings: wallets.into_iter().collect(),
            liquidity_pool: reading(Query::LiquidityPool, liquidity_pool),
            router: reading(Query::Router, router),
            fee_excluded,
            cooldown_excluded,
            features: features.into_iter().collect(),
            balances: balances.into_iter().collect(),
            degraded_mode: reading(Query::DegradedMode, degraded_mode),
            degraded_mode_activated_at: reading(
                Query::DegradedModeActivatedAt,
                degraded_mode_activated_at,
            ),
            setup_completed: reading(Query::SetupCompleted, setup_completed),
            trading_enabled: reading(Query::TradingEnabled, trading_enabled),
        };

        debug!(
            subjects = scope.exclusion_subjects.len(),
            holders = scope.balance_holders.len(),
            failures = state.read_failures().len(),
            "snapshot captured"
        );
        state
    }

    // -- targeted reads: one fresh read each ------------------------------

    pub async fn helper_binding(&self) -> Reading<Address> {
        reading(Query::HelperBinding, self.ledger.helper_binding().await)
    }

    pub async fn wallet_binding(&self, kind: WalletKind) -> Reading<Address> {
        reading(Query::WalletBinding(kind), self.ledger.wallet_binding(kind).await)
    }

    pub async fn liquidity_pool(&self) -> Reading<Address> {
        reading(Query::LiquidityPool, self.ledger.liquidity_pool().await)
    }

    pub async fn fee_excluded(&self, who: Address) -> Reading<bool> {
        reading(Query::FeeExclusion(who), self.ledger.fee_excluded(who).await)
    }

    pub async fn cooldown_excluded(&self, who: Address) -> Reading<bool> {
        reading(Query::CooldownExclusion(who), self.ledger.cooldown_excluded(who).await)
    }

    pub async fn feature(&self, flag: FeatureFlag) -> Reading<bool> {
        reading(Query::FeatureFlag(flag), self.ledger.feature_enabled(flag).await)
    }

    pub async fn balance_of(&self, who: Address) -> Reading<U256> {
        reading(Query::Balance(who), self.ledger.balance_of(who).await)
    }

    pub async fn degraded_mode(&self) -> Reading<bool> {
        reading(Query::DegradedMode, self.ledger.degraded_mode().await)
    }

    pub async fn setup_completed(&self) -> Reading<bool> {
        reading(Query::SetupCompleted, self.ledger.setup_completed().await)
    }
}
