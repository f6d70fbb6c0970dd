//! A single idempotent reconciliation step.
//!
//! Steps are built fresh from the target and the phase being run, executed at
//! most once per run, and never cached. `precondition` false means the step
//! is a no-op; that is what makes re-running the whole pipeline safe.

use std::fmt;

use serde::{Deserialize, Serialize};
use tsc_ledger::Mutation;
use tsc_schemas::{short_addr, Address, FeatureFlag, WalletKind, U256};

use crate::funding::FundingAllocator;
use crate::types::Phase;

/// A readable configuration surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Setting {
    HelperBinding,
    WalletBinding(WalletKind),
    FeeExclusion(Address),
    CooldownExclusion(Address),
    Feature(FeatureFlag),
    Balance(Address),
    SetupCompleted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    Address(Address),
    Flag(bool),
    Amount(U256),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Address(a) if *a == Address::ZERO => f.write_str("unset"),
            SettingValue::Address(a) => f.write_str(&short_addr(a)),
            SettingValue::Flag(b) => write!(f, "{b}"),
            SettingValue::Amount(v) => write!(f, "{v}"),
        }
    }
}

/// How the observed value relates to the desired one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    /// Must equal this address; any other value is replaced.
    Bind(Address),
    /// Must equal this address, but only an unset binding is replaced.
    BindIfUnset(Address),
    /// Must equal this flag.
    Flag(bool),
    /// Turned on when off; never turned off.
    EnableOnly,
    /// Disbursed only while the balance is exactly zero.
    FundIfEmpty(U256),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconciliationStep {
    pub phase: Phase,
    pub subject: String,
    pub setting: Setting,
    pub rule: Rule,
    pub mutation: Mutation,
}

impl ReconciliationStep {
    pub fn new(
        phase: Phase,
        subject: impl Into<String>,
        setting: Setting,
        rule: Rule,
        mutation: Mutation,
    ) -> Self {
        Self {
            phase,
            subject: subject.into(),
            setting,
            rule,
            mutation,
        }
    }

    /// True when the mutation should be issued.
    pub fn precondition(&self, observed: &SettingValue) -> bool {
        match (self.rule, observed) {
            (Rule::Bind(want), SettingValue::Address(a)) => *a != want,
            (Rule::BindIfUnset(_), SettingValue::Address(a)) => *a == Address::ZERO,
            (Rule::Flag(want), SettingValue::Flag(b)) => *b != want,
            (Rule::EnableOnly, SettingValue::Flag(b)) => !*b,
            (Rule::FundIfEmpty(_), SettingValue::Amount(v)) => FundingAllocator::needs_funding(*v),
            _ => false,
        }
    }

    /// True when the setting is in its desired state.
    pub fn postcondition(&self, observed: &SettingValue) -> bool {
        match (self.rule, observed) {
            (Rule::Bind(want) | Rule::BindIfUnset(want), SettingValue::Address(a)) => *a == want,
            (Rule::Flag(want), SettingValue::Flag(b)) => *b == want,
            (Rule::EnableOnly, SettingValue::Flag(b)) => *b,
            (Rule::FundIfEmpty(amount), SettingValue::Amount(v)) => *v >= amount,
            _ => false,
        }
    }

    /// Bound to something else and not allowed to replace it.
    pub fn conflicts(&self, observed: &SettingValue) -> bool {
        match (self.rule, observed) {
            (Rule::BindIfUnset(want), SettingValue::Address(a)) => {
                *a != Address::ZERO && *a != want
            }
            _ => false,
        }
    }

    /// Human-readable desired value, for failure context.
    pub fn desired(&self) -> String {
        match self.rule {
            Rule::Bind(a) | Rule::BindIfUnset(a) => SettingValue::Address(a).to_string(),
            Rule::Flag(b) => b.to_string(),
            Rule::EnableOnly => "true".to_string(),
            Rule::FundIfEmpty(v) => format!(">= {v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const H: Address = address!("824730FE53a434E700D43Ac128264d580b0C105c");
    const OTHER: Address = address!("5BD594887A6a99b991E56E2541785B61606063bF");

    fn bind(rule: Rule) -> ReconciliationStep {
        ReconciliationStep::new(
            Phase::WalletBindings,
            "advertising_wallet",
            Setting::WalletBinding(WalletKind::Advertising),
            rule,
            Mutation::SetWalletBinding {
                kind: WalletKind::Advertising,
                address: H,
            },
        )
    }

    #[test]
    fn matching_value_is_a_no_op() {
        let s = bind(Rule::Bind(H));
        assert!(!s.precondition(&SettingValue::Address(H)));
        assert!(s.postcondition(&SettingValue::Address(H)));
    }

    #[test]
    fn bind_if_unset_refuses_to_replace_another_binding() {
        let s = bind(Rule::BindIfUnset(H));
        assert!(s.precondition(&SettingValue::Address(Address::ZERO)));
        assert!(!s.precondition(&SettingValue::Address(OTHER)));
        assert!(s.conflicts(&SettingValue::Address(OTHER)));
        assert!(!s.conflicts(&SettingValue::Address(H)));
    }

    #[test]
    fn enable_only_never_acts_on_an_enabled_flag() {
        let s = ReconciliationStep::new(
            Phase::FeatureActivation,
            "buy_tax",
            Setting::Feature(FeatureFlag::BuyTax),
            Rule::EnableOnly,
            Mutation::ToggleFeature {
                flag: FeatureFlag::BuyTax,
            },
        );
        assert!(s.precondition(&SettingValue::Flag(false)));
        assert!(!s.precondition(&SettingValue::Flag(true)));
    }

    #[test]
    fn funding_only_targets_an_exactly_empty_balance() {
        let s = ReconciliationStep::new(
            Phase::TreasuryFunding,
            "community_wallet",
            Setting::Balance(OTHER),
            Rule::FundIfEmpty(U256::from(100u64)),
            Mutation::Disburse {
                wallet: WalletKind::Community,
                amount: U256::from(100u64),
            },
        );
        assert!(s.precondition(&SettingValue::Amount(U256::ZERO)));
        assert!(!s.precondition(&SettingValue::Amount(U256::from(1u64))));
        assert!(s.postcondition(&SettingValue::Amount(U256::from(100u64))));
    }

    #[test]
    fn mismatched_value_kinds_never_trigger_a_mutation() {
        let s = bind(Rule::Bind(H));
        assert!(!s.precondition(&SettingValue::Flag(true)));
    }
}
