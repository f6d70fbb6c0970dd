//! tsc-schemas
//!
//! Shared domain types for the token setup controller.
//!
//! Everything here is plain data: no IO, no ledger access. Addresses and
//! 256-bit token amounts come from `alloy-primitives` so every crate agrees on
//! one representation (checksummed display, exact integer arithmetic).

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

pub use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Token and native-coin amounts use 18 decimals.
pub const DECIMALS: u64 = 18;

/// Whole tokens to base units (`whole * 10^18`).
pub fn tokens(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(DECIMALS))
}

/// Tenths of a coin in base units. Native balance thresholds like 0.5 or 0.1.
pub fn tenths(tenths: u64) -> U256 {
    U256::from(tenths) * U256::from(10u64).pow(U256::from(DECIMALS - 1))
}

/// Abbreviated form for logs: `0x10ED…024E`.
pub fn short_addr(addr: &Address) -> String {
    let full = addr.to_checksum(None);
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

// ---------------------------------------------------------------------------
// Wallets + features
// ---------------------------------------------------------------------------

/// The two treasury wallets the token contract knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    Advertising,
    Community,
}

impl WalletKind {
    pub const ALL: [WalletKind; 2] = [WalletKind::Advertising, WalletKind::Community];

    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::Advertising => "advertising",
            WalletKind::Community => "community",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Toggle-only protection features on the token contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFlag {
    /// Anti-concentration ("dump spike") detection.
    DumpSpikeDetection,
    /// Anti-sybil defense.
    SybilDefense,
    /// Buy-side tax.
    BuyTax,
}

impl FeatureFlag {
    /// Activation order used by the engine.
    pub const ALL: [FeatureFlag; 3] = [
        FeatureFlag::DumpSpikeDetection,
        FeatureFlag::SybilDefense,
        FeatureFlag::BuyTax,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureFlag::DumpSpikeDetection => "dump_spike_detection",
            FeatureFlag::SybilDefense => "sybil_defense",
            FeatureFlag::BuyTax => "buy_tax",
        }
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired feature state. `false` means "no opinion": the engine never turns a
/// flag off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    #[serde(default = "default_true")]
    pub dump_spike_detection: bool,
    #[serde(default = "default_true")]
    pub sybil_defense: bool,
    #[serde(default = "default_true")]
    pub buy_tax: bool,
}

impl FeatureSet {
    pub fn all_on() -> Self {
        Self {
            dump_spike_detection: true,
            sybil_defense: true,
            buy_tax: true,
        }
    }

    pub fn wants(&self, flag: FeatureFlag) -> bool {
        match flag {
            FeatureFlag::DumpSpikeDetection => self.dump_spike_detection,
            FeatureFlag::SybilDefense => self.sybil_defense,
            FeatureFlag::BuyTax => self.buy_tax,
        }
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all_on()
    }
}

// ---------------------------------------------------------------------------
// Network profile
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Primary,
    Staging,
    /// Unrecognised network identity. Behaves like staging.
    Fallback,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Primary => "PRIMARY",
            ProfileKind::Staging => "STAGING",
            ProfileKind::Fallback => "FALLBACK",
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, ProfileKind::Primary)
    }
}

/// Per-network constants. Resolved once per run from the ledger's reported
/// network identity and read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub kind: ProfileKind,
    /// Network identity as reported by the ledger (chain id).
    pub network_id: u64,
    pub name: String,
    /// DEX router the token trades through.
    pub router: Address,
    /// Native balance the operator needs to pay for the run's operations.
    pub min_operator_balance: U256,
    /// Per-recipient treasury funding amount (token base units).
    pub funding_amount: U256,
    /// Gas ceiling attached to every mutating operation. `None` = ledger default.
    pub gas_ceiling_per_operation: Option<u64>,
    /// Pause before the first mutating operation.
    pub safety_delay_ms: u64,
}

impl NetworkProfile {
    pub fn safety_delay(&self) -> Duration {
        Duration::from_millis(self.safety_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Target configuration
// ---------------------------------------------------------------------------

/// Desired configuration, validated. Built from a config document by
/// `tsc-config`; never mutated by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfiguration {
    pub helper_contract: Address,
    /// Read-only lens contract; only ever excluded from fees/cooldowns.
    pub lens_contract: Option<Address>,
    pub advertising_wallet: Address,
    pub community_wallet: Address,
    pub liquidity_pool: Option<Address>,
    pub additional_exclusions: BTreeSet<Address>,
    pub features: FeatureSet,
}

impl TargetConfiguration {
    pub fn wallet(&self, kind: WalletKind) -> Address {
        match kind {
            WalletKind::Advertising => self.advertising_wallet,
            WalletKind::Community => self.community_wallet,
        }
    }

    /// System addresses that must be excluded from fees and cooldowns, in
    /// processing order, deduplicated (first label wins). Additional
    /// exclusions are processed in address order and labeled by address, so
    /// the label does not depend on where the operator listed them.
    pub fn system_addresses(&self) -> Vec<(String, Address)> {
        let mut out: Vec<(String, Address)> = Vec::new();
        let mut push = |label: String, addr: Address| {
            if !out.iter().any(|(_, a)| *a == addr) {
                out.push((label, addr));
            }
        };

        push("helper_contract".to_string(), self.helper_contract);
        if let Some(lens) = self.lens_contract {
            push("lens_contract".to_string(), lens);
        }
        push("advertising_wallet".to_string(), self.advertising_wallet);
        push("community_wallet".to_string(), self.community_wallet);
        for addr in &self.additional_exclusions {
            push(format!("additional_exclusion:{addr}"), *addr);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What to do when a treasury wallet is already bound to a different address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletRebindPolicy {
    /// Leave the existing binding, record a conflict.
    #[default]
    Refuse,
    /// Re-bind to the target address.
    Overwrite,
}

/// Operator policy knobs for one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupPolicy {
    #[serde(default)]
    pub wallet_rebind: WalletRebindPolicy,
    #[serde(default = "default_true")]
    pub fund_wallets: bool,
    #[serde(default)]
    pub complete_setup: bool,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl Default for SetupPolicy {
    fn default() -> Self {
        Self {
            wallet_rebind: WalletRebindPolicy::Refuse,
            fund_wallets: true,
            complete_setup: false,
            deadline_secs: None,
        }
    }
}

impl SetupPolicy {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Expected token identity, checked during preflight when set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIdentity {
    #[serde(default)]
    pub expected_name: Option<String>,
    #[serde(default)]
    pub expected_symbol: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn target() -> TargetConfiguration {
        TargetConfiguration {
            helper_contract: address!("824730FE53a434E700D43Ac128264d580b0C105c"),
            lens_contract: Some(address!("4a9640dc292F7025bD0D1410eEc6CE900020FEfd")),
            advertising_wallet: address!("5BD594887A6a99b991E56E2541785B61606063bF"),
            community_wallet: address!("3c4AA84c1e2177c18420E7F1cE70fa65fBC4Fd59"),
            liquidity_pool: None,
            additional_exclusions: BTreeSet::new(),
            features: FeatureSet::all_on(),
        }
    }

    #[test]
    fn tokens_scales_by_eighteen_decimals() {
        assert_eq!(tokens(1), U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(tenths(5), U256::from(500_000_000_000_000_000u128));
    }

    #[test]
    fn system_addresses_keep_order_and_dedupe() {
        let mut t = target();
        // extra duplicates the advertising wallet; must not appear twice
        t.additional_exclusions.insert(t.advertising_wallet);
        let extra = address!("54D6442676a2B849a35a36341EB5BaBa7248db7d");
        t.additional_exclusions.insert(extra);

        let labels: Vec<String> = t.system_addresses().into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels[0], "helper_contract");
        assert_eq!(labels[1], "lens_contract");
        assert_eq!(labels[2], "advertising_wallet");
        assert_eq!(labels[3], "community_wallet");
        assert_eq!(
            labels[4],
            "additional_exclusion:0x54D6442676a2B849a35a36341EB5BaBa7248db7d"
        );
        assert_eq!(labels.len(), 5);
    }

    #[test]
    fn short_addr_is_checksummed() {
        let a = address!("10ED43C718714eb63d5aA57B78B54704E256024E");
        assert_eq!(short_addr(&a), "0x10ED…024E");
    }

    #[test]
    fn policy_defaults_are_conservative() {
        let p: SetupPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(p.wallet_rebind, WalletRebindPolicy::Refuse);
        assert!(p.fund_wallets);
        assert!(!p.complete_setup);
        assert!(p.deadline().is_none());
    }
}
