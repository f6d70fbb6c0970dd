//! tsc-ledger
//!
//! The ledger collaborator as the controller sees it: a set of side-effect free
//! queries plus a small set of mutations that each return a confirmable handle.
//!
//! Wire format, signing and transaction submission belong to the
//! implementation behind [`Ledger`]. This crate only fixes the contract and
//! provides the read-side snapshot machinery ([`ObservedStateReader`]).

use std::fmt;

use serde::{Deserialize, Serialize};
use tsc_schemas::{short_addr, Address, FeatureFlag, WalletKind, U256};

mod error;
mod reader;
mod state;

pub use error::{LedgerError, ReadFailure};
pub use reader::{ObservedStateReader, ReadScope};
pub use state::{ObservedState, Reading};

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Every read the controller may issue. Used to label read failures and by
/// test doubles for fault injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    NetworkId,
    Operator,
    NativeBalance(Address),
    Owner,
    /// The token contract's own address.
    TokenAddress,
    Name,
    Symbol,
    TotalSupply,
    Balance(Address),
    HelperBinding,
    /// Owner of the helper contract at this address.
    HelperOwner(Address),
    /// Token the helper contract at this address was deployed for.
    HelperToken(Address),
    WalletBinding(WalletKind),
    LiquidityPool,
    Router,
    FeeExclusion(Address),
    CooldownExclusion(Address),
    FeatureFlag(FeatureFlag),
    DegradedMode,
    DegradedModeActivatedAt,
    SetupCompleted,
    TradingEnabled,
}

impl Query {
    /// Operation name without arguments, e.g. `get-fee-exclusion`.
    pub fn name(&self) -> &'static str {
        match self {
            Query::NetworkId => "get-network-id",
            Query::Operator => "get-operator",
            Query::NativeBalance(_) => "get-native-balance",
            Query::Owner => "get-owner",
            Query::TokenAddress => "get-token-address",
            Query::Name => "get-name",
            Query::Symbol => "get-symbol",
            Query::TotalSupply => "get-total-supply",
            Query::Balance(_) => "get-balance",
            Query::HelperBinding => "get-helper-binding",
            Query::HelperOwner(_) => "get-helper-owner",
            Query::HelperToken(_) => "get-helper-token",
            Query::WalletBinding(_) => "get-wallet-binding",
            Query::LiquidityPool => "get-liquidity-pool",
            Query::Router => "get-router",
            Query::FeeExclusion(_) => "get-fee-exclusion",
            Query::CooldownExclusion(_) => "get-cooldown-exclusion",
            Query::FeatureFlag(_) => "get-feature-flag",
            Query::DegradedMode => "get-degraded-mode",
            Query::DegradedModeActivatedAt => "get-degraded-mode-activated-at",
            Query::SetupCompleted => "get-setup-completed",
            Query::TradingEnabled => "get-trading-enabled",
        }
    }

    /// The address argument, for per-address queries.
    pub fn subject(&self) -> Option<Address> {
        match self {
            Query::NativeBalance(a)
            | Query::Balance(a)
            | Query::FeeExclusion(a)
            | Query::CooldownExclusion(a)
            | Query::HelperOwner(a)
            | Query::HelperToken(a) => Some(*a),
            _ => None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::WalletBinding(kind) => write!(f, "{}({kind})", self.name()),
            Query::FeatureFlag(flag) => write!(f, "{}({flag})", self.name()),
            q => match q.subject() {
                Some(a) => write!(f, "{}({})", q.name(), short_addr(&a)),
                None => f.write_str(q.name()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    SetHelperBinding { address: Address },
    SetWalletBinding { kind: WalletKind, address: Address },
    SetFeeExclusion { address: Address, excluded: bool },
    SetCooldownExclusion { address: Address, excluded: bool },
    ToggleFeature { flag: FeatureFlag },
    Disburse { wallet: WalletKind, amount: U256 },
    MarkSetupCompleted,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SetHelperBinding { .. } => "set-helper-binding",
            Mutation::SetWalletBinding { .. } => "set-wallet-binding",
            Mutation::SetFeeExclusion { .. } => "set-fee-exclusion",
            Mutation::SetCooldownExclusion { .. } => "set-cooldown-exclusion",
            Mutation::ToggleFeature { .. } => "toggle-feature",
            Mutation::Disburse { .. } => "disburse",
            Mutation::MarkSetupCompleted => "mark-setup-completed",
        }
    }

    /// The address this mutation configures, if any.
    pub fn subject(&self) -> Option<Address> {
        match self {
            Mutation::SetHelperBinding { address }
            | Mutation::SetWalletBinding { address, .. }
            | Mutation::SetFeeExclusion { address, .. }
            | Mutation::SetCooldownExclusion { address, .. } => Some(*address),
            _ => None,
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.name();
        match self {
            Mutation::SetHelperBinding { address } => write!(f, "{n}({})", short_addr(address)),
            Mutation::SetWalletBinding { kind, address } => {
                write!(f, "{n}({kind}, {})", short_addr(address))
            }
            Mutation::SetFeeExclusion { address, excluded }
            | Mutation::SetCooldownExclusion { address, excluded } => {
                write!(f, "{n}({}, {excluded})", short_addr(address))
            }
            Mutation::ToggleFeature { flag } => write!(f, "{n}({flag})"),
            Mutation::Disburse { wallet, amount } => write!(f, "{n}({wallet}, {amount})"),
            Mutation::MarkSetupCompleted => f.write_str(n),
        }
    }
}

/// Per-operation submission options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpOptions {
    /// Gas ceiling. `None` lets the ledger estimate.
    pub gas_limit: Option<u64>,
}

/// Handle for a submitted, not yet confirmed, mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpHandle {
    pub id: String,
    /// Per-sender sequence number the operation was submitted with.
    pub nonce: u64,
}

/// Durable confirmation of a mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub handle: OpHandle,
    pub block: u64,
}

// ---------------------------------------------------------------------------
// Ledger trait
// ---------------------------------------------------------------------------

/// Query/mutate surface of the token's on-chain configuration.
///
/// Queries have no side effects and may run concurrently. Mutations do not:
/// the caller submits one, waits for [`Ledger::wait_confirmed`], and only then
/// submits the next. Implementations may reject a second submission while one
/// is outstanding ([`LedgerError::NonceConflict`]).
///
/// Addresses read back as [`Address::ZERO`] when unset.
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    async fn network_id(&self) -> Result<u64, LedgerError>;
    /// The identity every mutation is submitted from.
    async fn operator(&self) -> Result<Address, LedgerError>;
    async fn native_balance(&self, who: Address) -> Result<U256, LedgerError>;

    async fn owner(&self) -> Result<Address, LedgerError>;
    async fn token_address(&self) -> Result<Address, LedgerError>;
    async fn name(&self) -> Result<String, LedgerError>;
    async fn symbol(&self) -> Result<String, LedgerError>;
    async fn total_supply(&self) -> Result<U256, LedgerError>;
    async fn balance_of(&self, who: Address) -> Result<U256, LedgerError>;

    async fn helper_binding(&self) -> Result<Address, LedgerError>;
    /// Reads the helper contract at `helper`, which need not be bound yet.
    async fn helper_owner(&self, helper: Address) -> Result<Address, LedgerError>;
    async fn helper_token(&self, helper: Address) -> Result<Address, LedgerError>;
    async fn wallet_binding(&self, kind: WalletKind) -> Result<Address, LedgerError>;
    async fn liquidity_pool(&self) -> Result<Address, LedgerError>;
    async fn router(&self) -> Result<Address, LedgerError>;
    async fn fee_excluded(&self, who: Address) -> Result<bool, LedgerError>;
    async fn cooldown_excluded(&self, who: Address) -> Result<bool, LedgerError>;
    async fn feature_enabled(&self, flag: FeatureFlag) -> Result<bool, LedgerError>;

    async fn degraded_mode(&self) -> Result<bool, LedgerError>;
    /// Unix seconds of the last trip; 0 if never tripped.
    async fn degraded_mode_activated_at(&self) -> Result<u64, LedgerError>;
    async fn setup_completed(&self) -> Result<bool, LedgerError>;
    async fn trading_enabled(&self) -> Result<bool, LedgerError>;

    async fn submit(&self, op: &Mutation, opts: &OpOptions) -> Result<OpHandle, LedgerError>;
    async fn wait_confirmed(&self, handle: &OpHandle) -> Result<Receipt, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ROUTER: Address = address!("10ED43C718714eb63d5aA57B78B54704E256024E");

    #[test]
    fn mutation_display_names_the_operation_and_arguments() {
        let m = Mutation::SetFeeExclusion {
            address: ROUTER,
            excluded: false,
        };
        assert_eq!(m.to_string(), "set-fee-exclusion(0x10ED…024E, false)");
        assert_eq!(Mutation::MarkSetupCompleted.to_string(), "mark-setup-completed");
    }

    #[test]
    fn query_subject_is_only_set_for_per_address_reads() {
        assert_eq!(Query::FeeExclusion(ROUTER).subject(), Some(ROUTER));
        assert_eq!(Query::Router.subject(), None);
        assert_eq!(
            Query::WalletBinding(WalletKind::Community).to_string(),
            "get-wallet-binding(community)"
        );
    }
}
