//! Deterministic in-memory ledger.
//!
//! Stands in for the real token contract in tests and in `tsc reconcile`
//! dry runs:
//! - State is plain serde data ([`SimState`]) so it can be loaded from and
//!   written back to a JSON file.
//! - Handles are derived from the sender nonce: `sim:op:{nonce}`. No
//!   randomness.
//! - Mutations are checked at submit time (owner, balances, bindings) and
//!   applied at confirmation time.
//! - Only one mutation may be outstanding. A second submit before
//!   `wait_confirmed` fails with `NonceConflict`.
//! - Every call is recorded in order ([`SimCall`]) for assertions.
//! - Faults can be injected per query name, per mutation name or per address.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use tsc_ledger::{Ledger, LedgerError, Mutation, OpHandle, OpOptions, Query, Receipt};
use tsc_schemas::{Address, FeatureFlag, WalletKind, U256};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// A deployed helper contract, keyed by its address in [`SimState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimHelper {
    pub owner: Address,
    pub token: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimState {
    pub network_id: u64,
    pub operator: Address,
    pub owner: Address,
    pub token_address: Address,
    pub name: String,
    pub symbol: String,
    pub total_supply: U256,
    pub native_balances: BTreeMap<Address, U256>,
    pub token_balances: BTreeMap<Address, U256>,

    pub helper: Address,
    /// Helper contracts deployed on the ledger. Reading one that is absent
    /// reverts.
    pub helper_contracts: BTreeMap<Address, SimHelper>,
    pub advertising_wallet: Address,
    pub community_wallet: Address,
    pub liquidity_pool: Address,
    pub router: Address,
    pub fee_excluded: BTreeSet<Address>,
    pub cooldown_excluded: BTreeSet<Address>,
    pub features: BTreeSet<FeatureFlag>,

    pub degraded_mode: bool,
    pub degraded_mode_activated_at: u64,
    pub setup_completed: bool,
    pub trading_enabled: bool,

    /// Binding a non-zero helper lifts degraded mode, as the contract does
    /// once its helper checks pass. Turn off to model a helper that never
    /// recovers.
    pub helper_clears_degraded: bool,
    /// The ledger lifts degraded mode on its own once this block is reached,
    /// independent of anything the controller does.
    pub degraded_recovers_at_block: Option<u64>,
    pub block: u64,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            network_id: 97,
            operator: Address::ZERO,
            owner: Address::ZERO,
            token_address: Address::ZERO,
            name: String::new(),
            symbol: String::new(),
            total_supply: U256::ZERO,
            native_balances: BTreeMap::new(),
            token_balances: BTreeMap::new(),
            helper: Address::ZERO,
            helper_contracts: BTreeMap::new(),
            advertising_wallet: Address::ZERO,
            community_wallet: Address::ZERO,
            liquidity_pool: Address::ZERO,
            router: Address::ZERO,
            fee_excluded: BTreeSet::new(),
            cooldown_excluded: BTreeSet::new(),
            features: BTreeSet::new(),
            degraded_mode: false,
            degraded_mode_activated_at: 0,
            setup_completed: false,
            trading_enabled: false,
            helper_clears_degraded: true,
            degraded_recovers_at_block: None,
            block: 0,
        }
    }
}

impl SimState {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).with_context(|| format!("read ledger state: {path:?}"))?;
        serde_json::from_str(&s).with_context(|| format!("parse ledger state json: {path:?}"))
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let s = serde_json::to_string_pretty(self).context("serialize ledger state")?;
        fs::write(path, s).with_context(|| format!("write ledger state: {path:?}"))
    }

    pub fn wallet(&self, kind: WalletKind) -> Address {
        match kind {
            WalletKind::Advertising => self.advertising_wallet,
            WalletKind::Community => self.community_wallet,
        }
    }

    pub fn token_balance(&self, who: Address) -> U256 {
        self.token_balances.get(&who).copied().unwrap_or(U256::ZERO)
    }

    fn helper_contract(&self, at: Address) -> Result<SimHelper, String> {
        self.helper_contracts
            .get(&at)
            .copied()
            .ok_or_else(|| "no helper contract at address".to_string())
    }
}

// ---------------------------------------------------------------------------
// Faults + call log
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Faults {
    /// Query names (`get-router`, ...) that fail with a transport error.
    pub failing_queries: BTreeSet<String>,
    /// Any per-address query about these addresses fails.
    pub failing_subjects: BTreeSet<Address>,
    /// Mutation names (`set-fee-exclusion`, ...) that revert.
    pub reverting_ops: BTreeSet<String>,
    /// Any mutation configuring these addresses reverts.
    pub reverting_subjects: BTreeSet<Address>,
    /// Confirmation latency.
    pub confirm_delay_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimCall {
    Query(Query),
    Submit { op: Mutation, opts: OpOptions },
    Confirm(String),
}

struct Inner {
    state: SimState,
    faults: Faults,
    calls: Vec<SimCall>,
    pending: Option<(OpHandle, Mutation)>,
    next_nonce: u64,
}

impl Inner {
    fn read<T>(&mut self, q: Query, f: impl FnOnce(&SimState) -> T) -> Result<T, LedgerError> {
        self.calls.push(SimCall::Query(q));
        let subject_fails = q
            .subject()
            .is_some_and(|a| self.faults.failing_subjects.contains(&a));
        if subject_fails || self.faults.failing_queries.contains(q.name()) {
            return Err(LedgerError::Transport(format!("injected fault on {q}")));
        }
        Ok(f(&self.state))
    }

    /// A read the contract itself may revert.
    fn try_read<T>(
        &mut self,
        q: Query,
        f: impl FnOnce(&SimState) -> Result<T, String>,
    ) -> Result<T, LedgerError> {
        self.read(q, f)?.map_err(|reason| LedgerError::Reverted {
            op: q.name().to_string(),
            reason,
        })
    }

    /// Contract-side checks, run at submit time.
    fn precheck(&self, op: &Mutation) -> Result<(), String> {
        let s = &self.state;
        if s.operator != s.owner {
            return Err("caller is not the owner".to_string());
        }
        match op {
            Mutation::SetHelperBinding { address } | Mutation::SetWalletBinding { address, .. }
                if *address == Address::ZERO =>
            {
                Err("zero address".to_string())
            }
            Mutation::Disburse { wallet, amount } => {
                if s.wallet(*wallet) == Address::ZERO {
                    return Err(format!("{wallet} wallet not set"));
                }
                if s.token_balance(s.operator) < *amount {
                    return Err("transfer amount exceeds balance".to_string());
                }
                Ok(())
            }
            Mutation::MarkSetupCompleted if s.liquidity_pool == Address::ZERO => {
                Err("liquidity pool not set".to_string())
            }
            Mutation::MarkSetupCompleted if s.setup_completed => {
                Err("setup already completed".to_string())
            }
            _ => Ok(()),
        }
    }

    fn apply(&mut self, op: &Mutation) {
        let s = &mut self.state;
        match op {
            Mutation::SetHelperBinding { address } => {
                s.helper = *address;
                if s.helper_clears_degraded && *address != Address::ZERO {
                    s.degraded_mode = false;
                }
            }
            Mutation::SetWalletBinding { kind, address } => match kind {
                WalletKind::Advertising => s.advertising_wallet = *address,
                WalletKind::Community => s.community_wallet = *address,
            },
            Mutation::SetFeeExclusion { address, excluded } => {
                set_membership(&mut s.fee_excluded, *address, *excluded)
            }
            Mutation::SetCooldownExclusion { address, excluded } => {
                set_membership(&mut s.cooldown_excluded, *address, *excluded)
            }
            Mutation::ToggleFeature { flag } => {
                if !s.features.remove(flag) {
                    s.features.insert(*flag);
                }
            }
            Mutation::Disburse { wallet, amount } => {
                let to = s.wallet(*wallet);
                let from = s.operator;
                let from_bal = s.token_balance(from).saturating_sub(*amount);
                let to_bal = s.token_balance(to).saturating_add(*amount);
                s.token_balances.insert(from, from_bal);
                s.token_balances.insert(to, to_bal);
            }
            Mutation::MarkSetupCompleted => s.setup_completed = true,
        }
        s.block += 1;
        if s.degraded_recovers_at_block.is_some_and(|b| s.block >= b) {
            s.degraded_mode = false;
        }
    }
}

fn set_membership(set: &mut BTreeSet<Address>, a: Address, member: bool) {
    if member {
        set.insert(a);
    } else {
        set.remove(&a);
    }
}

// ---------------------------------------------------------------------------
// SimLedger
// ---------------------------------------------------------------------------

pub struct SimLedger {
    inner: Mutex<Inner>,
}

impl SimLedger {
    pub fn new(state: SimState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                faults: Faults::default(),
                calls: Vec::new(),
                pending: None,
                next_nonce: 0,
            }),
        }
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.inner.get_mut().faults = faults;
        self
    }

    pub async fn set_faults(&self, faults: Faults) {
        self.inner.lock().await.faults = faults;
    }

    pub async fn state(&self) -> SimState {
        self.inner.lock().await.state.clone()
    }

    /// Mutate ledger state directly, outside the call log.
    pub async fn update(&self, f: impl FnOnce(&mut SimState)) {
        f(&mut self.inner.lock().await.state);
    }

    pub async fn calls(&self) -> Vec<SimCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Submitted mutations in order (including ones that reverted).
    pub async fn submitted(&self) -> Vec<Mutation> {
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|c| match c {
                SimCall::Submit { op, .. } => Some(op.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.inner.lock().await.calls.clear();
    }
}

#[async_trait::async_trait]
impl Ledger for SimLedger {
    async fn network_id(&self) -> Result<u64, LedgerError> {
        self.inner.lock().await.read(Query::NetworkId, |s| s.network_id)
    }

    async fn operator(&self) -> Result<Address, LedgerError> {
        self.inner.lock().await.read(Query::Operator, |s| s.operator)
    }

    async fn native_balance(&self, who: Address) -> Result<U256, LedgerError> {
        self.inner.lock().await.read(Query::NativeBalance(who), |s| {
            s.native_balances.get(&who).copied().unwrap_or(U256::ZERO)
        })
    }

    async fn owner(&self) -> Result<Address, LedgerError> {
        self.inner.lock().await.read(Query::Owner, |s| s.owner)
    }

    async fn token_address(&self) -> Result<Address, LedgerError> {
        self.inner.lock().await.read(Query::TokenAddress, |s| s.token_address)
    }

    async fn name(&self) -> Result<String, LedgerError> {
        self.inner.lock().await.read(Query::Name, |s| s.name.clone())
    }

    async fn symbol(&self) -> Result<String, LedgerError> {
        self.inner.lock().await.read(Query::Symbol, |s| s.symbol.clone())
    }

    async fn total_supply(&self) -> Result<U256, LedgerError> {
        self.inner.lock().await.read(Query::TotalSupply, |s| s.total_supply)
    }

    async fn balance_of(&self, who: Address) -> Result<U256, LedgerError> {
        self.inner
            .lock()
            .await
            .read(Query::Balance(who), |s| s.token_balance(who))
    }

    async fn helper_binding(&self) -> Result<Address, LedgerError> {
        self.inner.lock().await.read(Query::HelperBinding, |s| s.helper)
    }

    async fn helper_owner(&self, helper: Address) -> Result<Address, LedgerError> {
        self.inner
            .lock()
            .await
            .try_read(Query::HelperOwner(helper), |s| {
                s.helper_contract(helper).map(|h| h.owner)
            })
    }

    async fn helper_token(&self, helper: Address) -> Result<Address, LedgerError> {
        self.inner
            .lock()
            .await
            .try_read(Query::HelperToken(helper), |s| {
                s.helper_contract(helper).map(|h| h.token)
            })
    }

    async fn wallet_binding(&self, kind: WalletKind) -> Result<Address, LedgerError> {
        self.inner
            .lock()
            .await
            .read(Query::WalletBinding(kind), |s| s.wallet(kind))
    }

    async fn liquidity_pool(&self) -> Result<Address, LedgerError> {
        self.inner.lock().await.read(Query::LiquidityPool, |s| s.liquidity_pool)
    }

    async fn router(&self) -> Result<Address, LedgerError> {
        self.inner.lock().await.read(Query::Router, |s| s.router)
    }

    async fn fee_excluded(&self, who: Address) -> Result<bool, LedgerError> {
        self.inner
            .lock()
            .await
            .read(Query::FeeExclusion(who), |s| s.fee_excluded.contains(&who))
    }

    async fn cooldown_excluded(&self, who: Address) -> Result<bool, LedgerError> {
        self.inner
            .lock()
            .await
            .read(Query::CooldownExclusion(who), |s| s.cooldown_excluded.contains(&who))
    }

    async fn feature_enabled(&self, flag: FeatureFlag) -> Result<bool, LedgerError> {
        self.inner
            .lock()
            .await
            .read(Query::FeatureFlag(flag), |s| s.features.contains(&flag))
    }

    async fn degraded_mode(&self) -> Result<bool, LedgerError> {
        self.inner.lock().await.read(Query::DegradedMode, |s| s.degraded_mode)
    }

    async fn degraded_mode_activated_at(&self) -> Result<u64, LedgerError> {
        self.inner
            .lock()
            .await
            .read(Query::DegradedModeActivatedAt, |s| s.degraded_mode_activated_at)
    }

    async fn setup_completed(&self) -> Result<bool, LedgerError> {
        self.inner.lock().await.read(Query::SetupCompleted, |s| s.setup_completed)
    }

    async fn trading_enabled(&self) -> Result<bool, LedgerError> {
        self.inner.lock().await.read(Query::TradingEnabled, |s| s.trading_enabled)
    }

    async fn submit(&self, op: &Mutation, opts: &OpOptions) -> Result<OpHandle, LedgerError> {
        let mut g = self.inner.lock().await;
        g.calls.push(SimCall::Submit {
            op: op.clone(),
            opts: *opts,
        });

        if let Some((pending, _)) = &g.pending {
            return Err(LedgerError::NonceConflict {
                pending: pending.nonce,
            });
        }

        let injected = g.faults.reverting_ops.contains(op.name())
            || op
                .subject()
                .is_some_and(|a| g.faults.reverting_subjects.contains(&a));
        if injected {
            return Err(LedgerError::Reverted {
                op: op.to_string(),
                reason: "injected revert".to_string(),
            });
        }
        g.precheck(op).map_err(|reason| LedgerError::Reverted {
            op: op.to_string(),
            reason,
        })?;

        let nonce = g.next_nonce;
        g.next_nonce += 1;
        let handle = OpHandle {
            id: format!("sim:op:{nonce}"),
            nonce,
        };
        g.pending = Some((handle.clone(), op.clone()));
        debug!(op = %op, nonce, "sim: submitted");
        Ok(handle)
    }

    /// The operation lands as soon as confirmation is requested; the delay
    /// only holds back the receipt. A caller that gives up waiting leaves the
    /// effect applied, as a mined transaction would.
    async fn wait_confirmed(&self, handle: &OpHandle) -> Result<Receipt, LedgerError> {
        let (delay, receipt) = {
            let mut g = self.inner.lock().await;
            g.calls.push(SimCall::Confirm(handle.id.clone()));
            let op = match g.pending.take() {
                Some((pending, op)) if pending == *handle => op,
                other => {
                    g.pending = other;
                    return Err(LedgerError::UnknownOperation(handle.id.clone()));
                }
            };
            g.apply(&op);
            let receipt = Receipt {
                handle: handle.clone(),
                block: g.state.block,
            };
            (g.faults.confirm_delay_ms, receipt)
        };
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(receipt)
    }
}
