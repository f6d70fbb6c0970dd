//! Point-in-time view of the token's configuration.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tsc_schemas::{Address, FeatureFlag, WalletKind, U256};

use crate::{Query, ReadFailure};

/// A single field of a snapshot: the value, or why it could not be read.
pub type Reading<T> = Result<T, ReadFailure>;

/// Immutable snapshot assembled by [`crate::ObservedStateReader`].
///
/// Only valid at roughly `captured_at`. Take a fresh one whenever current
/// truth matters; never carry one across a mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    pub captured_at: DateTime<Utc>,

    pub owner: Reading<Address>,
    pub name: Reading<String>,
    pub symbol: Reading<String>,
    pub total_supply: Reading<U256>,

    pub helper_binding: Reading<Address>,
    pub wallet_bindings: BTreeMap<WalletKind, Reading<Address>>,
    /// `Address::ZERO` when no pool is registered.
    pub liquidity_pool: Reading<Address>,
    pub router: Reading<Address>,

    pub fee_excluded: BTreeMap<Address, Reading<bool>>,
    pub cooldown_excluded: BTreeMap<Address, Reading<bool>>,
    pub features: BTreeMap<FeatureFlag, Reading<bool>>,
    pub balances: BTreeMap<Address, Reading<U256>>,

    pub degraded_mode: Reading<bool>,
    /// Unix seconds; 0 if never tripped.
    pub degraded_mode_activated_at: Reading<u64>,
    pub setup_completed: Reading<bool>,
    pub trading_enabled: Reading<bool>,
}

impl ObservedState {
    pub fn wallet_binding(&self, kind: WalletKind) -> Reading<Address> {
        lookup(&self.wallet_bindings, &kind, Query::WalletBinding(kind))
    }

    pub fn fee_excluded(&self, who: Address) -> Reading<bool> {
        lookup(&self.fee_excluded, &who, Query::FeeExclusion(who))
    }

    pub fn cooldown_excluded(&self, who: Address) -> Reading<bool> {
        lookup(&self.cooldown_excluded, &who, Query::CooldownExclusion(who))
    }

    pub fn feature(&self, flag: FeatureFlag) -> Reading<bool> {
        lookup(&self.features, &flag, Query::FeatureFlag(flag))
    }

    pub fn balance(&self, who: Address) -> Reading<U256> {
        lookup(&self.balances, &who, Query::Balance(who))
    }

    /// Registered pool, `None` when unset.
    pub fn pool(&self) -> Reading<Option<Address>> {
        self.liquidity_pool
            .clone()
            .map(|p| (p != Address::ZERO).then_some(p))
    }

    /// Whole minutes degraded mode has been active at `captured_at`.
    /// `None` when not degraded, never tripped, or unreadable.
    pub fn degraded_minutes(&self) -> Option<i64> {
        match (&self.degraded_mode, &self.degraded_mode_activated_at) {
            (Ok(true), Ok(at)) if *at > 0 => {
                let since = DateTime::<Utc>::from_timestamp(i64::try_from(*at).ok()?, 0)?;
                Some((self.captured_at - since).num_minutes().max(0))
            }
            _ => None,
        }
    }

    /// Every field that failed to read, in a stable order.
    pub fn read_failures(&self) -> Vec<ReadFailure> {
        let mut out = Vec::new();
        let mut take = |e: Option<&ReadFailure>| {
            if let Some(e) = e {
                out.push(e.clone());
            }
        };
        take(self.owner.as_ref().err());
        take(self.name.as_ref().err());
        take(self.symbol.as_ref().err());
        take(self.total_supply.as_ref().err());
        take(self.helper_binding.as_ref().err());
        for r in self.wallet_bindings.values() {
            take(r.as_ref().err());
        }
        take(self.liquidity_pool.as_ref().err());
        take(self.router.as_ref().err());
        for r in self.fee_excluded.values() {
            take(r.as_ref().err());
        }
        for r in self.cooldown_excluded.values() {
            take(r.as_ref().err());
        }
        for r in self.features.values() {
            take(r.as_ref().err());
        }
        for r in self.balances.values() {
            take(r.as_ref().err());
        }
        take(self.degraded_mode.as_ref().err());
        take(self.degraded_mode_activated_at.as_ref().err());
        take(self.setup_completed.as_ref().err());
        take(self.trading_enabled.as_ref().err());
        out
    }
}

fn lookup<K: Ord, T: Clone>(map: &BTreeMap<K, Reading<T>>, key: &K, q: Query) -> Reading<T> {
    map.get(key)
        .cloned()
        .unwrap_or_else(|| Err(ReadFailure::not_read(q)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn state() -> ObservedState {
        ObservedState {
            captured_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            owner: Ok(Address::ZERO),
            name: Ok("Millies".to_string()),
            symbol: Ok("MILLIES".to_string()),
            total_supply: Ok(U256::ZERO),
            helper_binding: Ok(Address::ZERO),
            wallet_bindings: BTreeMap::new(),
            liquidity_pool: Ok(Address::ZERO),
            router: Ok(Address::ZERO),
            fee_excluded: BTreeMap::new(),
            cooldown_excluded: BTreeMap::new(),
            features: BTreeMap::new(),
            balances: BTreeMap::new(),
            degraded_mode: Ok(false),
            degraded_mode_activated_at: Ok(0),
            setup_completed: Ok(false),
            trading_enabled: Ok(false),
        }
    }

    #[test]
    fn zero_pool_reads_as_unset() {
        assert_eq!(state().pool(), Ok(None));
    }

    #[test]
    fn unread_address_is_a_read_failure_not_a_default() {
        let s = state();
        let err = s.fee_excluded(Address::repeat_byte(7)).unwrap_err();
        assert_eq!(err.query, Query::FeeExclusion(Address::repeat_byte(7)));
    }

    #[test]
    fn degraded_minutes_counts_from_activation() {
        let mut s = state();
        s.degraded_mode = Ok(true);
        let ninety_min_ago = s.captured_at.timestamp() - 90 * 60;
        s.degraded_mode_activated_at = Ok(ninety_min_ago as u64);
        assert_eq!(s.degraded_minutes(), Some(90));

        s.degraded_mode = Ok(false);
        assert_eq!(s.degraded_minutes(), None);
    }

    #[test]
    fn read_failures_are_collected() {
        let mut s = state();
        s.router = Err(ReadFailure::not_read(Query::Router));
        s.features.insert(
            FeatureFlag::BuyTax,
            Err(ReadFailure::not_read(Query::FeatureFlag(FeatureFlag::BuyTax))),
        );
        let failures = s.read_failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].query, Query::Router);
    }
}
