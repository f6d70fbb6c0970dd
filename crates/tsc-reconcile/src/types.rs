use std::fmt;

use serde::{Deserialize, Serialize};
use tsc_checklist::{Checklist, NextStep, Verdict};
use tsc_ledger::{Mutation, ReadFailure, Receipt};
use tsc_schemas::{short_addr, Address, FeatureFlag, NetworkProfile, WalletKind};
use uuid::Uuid;

use crate::error::ReconcileError;
use crate::guard::DegradedStatus;

/// Pipeline phases, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    HelperBinding,
    WalletBindings,
    VenueConfiguration,
    SystemExclusions,
    FeatureActivation,
    TreasuryFunding,
    SetupCompletion,
}

impl Phase {
    pub fn number(&self) -> u8 {
        match self {
            Phase::HelperBinding => 1,
            Phase::WalletBindings => 2,
            Phase::VenueConfiguration => 3,
            Phase::SystemExclusions => 4,
            Phase::FeatureActivation => 5,
            Phase::TreasuryFunding => 6,
            Phase::SetupCompletion => 7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::HelperBinding => "helper_binding",
            Phase::WalletBindings => "wallet_bindings",
            Phase::VenueConfiguration => "venue_configuration",
            Phase::SystemExclusions => "system_exclusions",
            Phase::FeatureActivation => "feature_activation",
            Phase::TreasuryFunding => "treasury_funding",
            Phase::SetupCompletion => "setup_completion",
        }
    }

    /// Later phases assume these bindings are correct.
    pub fn is_identity_critical(&self) -> bool {
        matches!(self, Phase::HelperBinding | Phase::WalletBindings)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.number(), self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Mutation confirmed and postcondition re-read as satisfied.
    Confirmed,
    /// Observed value already matched; nothing submitted.
    AlreadyConfigured,
    Skipped { reason: String },
    Failed { reason: String },
}

/// One line of the audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: Phase,
    pub subject: String,
    /// The mutation submitted. `None` for skips and already-configured steps.
    pub action: Option<Mutation>,
    pub before: Option<String>,
    pub after: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub receipt: Option<Receipt>,
}

/// Ordered accumulator of phase records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub records: Vec<PhaseRecord>,
}

impl AuditTrail {
    pub fn push(&mut self, rec: PhaseRecord) {
        self.records.push(rec);
    }

    /// Mutations submitted, in order, whether or not they confirmed.
    pub fn mutations(&self) -> Vec<&Mutation> {
        self.records.iter().filter_map(|r| r.action.as_ref()).collect()
    }

    pub fn for_phase(&self, phase: Phase) -> impl Iterator<Item = &PhaseRecord> {
        self.records.iter().filter(move |r| r.phase == phase)
    }
}

/// Failures that are reported but never stop the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoverableFailure {
    PerAddress {
        phase: Phase,
        subject: String,
        address: Address,
        reason: String,
    },
    Feature {
        flag: FeatureFlag,
        reason: String,
    },
    Funding {
        wallet: WalletKind,
        reason: String,
    },
    SetupCompletion {
        reason: String,
    },
    Read(ReadFailure),
    /// Degraded mode still active after the helper binding phase.
    UnresolvedDegradedMode {
        active_minutes: Option<i64>,
    },
}

impl fmt::Display for RecoverableFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoverableFailure::PerAddress {
                phase,
                subject,
                address,
                reason,
            } => write!(f, "phase {phase} {subject} ({}): {reason}", short_addr(address)),
            RecoverableFailure::Feature { flag, reason } => write!(f, "feature {flag}: {reason}"),
            RecoverableFailure::Funding { wallet, reason } => {
                write!(f, "funding {wallet} wallet: {reason}")
            }
            RecoverableFailure::SetupCompletion { reason } => {
                write!(f, "setup completion: {reason}")
            }
            RecoverableFailure::Read(e) => write!(f, "{e}"),
            RecoverableFailure::UnresolvedDegradedMode { .. } => {
                f.write_str("degraded mode still active after helper binding")
            }
        }
    }
}

/// Annotations that need operator attention but are not failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Warning {
    DegradedAtStart {
        active_minutes: Option<i64>,
    },
    RouterMismatch {
        configured: Address,
        expected: Address,
    },
    PoolMismatch {
        on_chain: Address,
        configured: Address,
    },
    NoLiquidityPool,
    WalletConflict {
        wallet: WalletKind,
        bound: Address,
        desired: Address,
    },
    /// A system address is also the router or pool; it stays taxed.
    VenueNotExcluded {
        subject: String,
        address: Address,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DegradedAtStart {
                active_minutes: Some(m),
            } => write!(f, "degraded mode active at start ({m} min)"),
            Warning::DegradedAtStart {
                active_minutes: None,
            } => f.write_str("degraded mode active at start"),
            Warning::RouterMismatch {
                configured,
                expected,
            } => write!(
                f,
                "token router {} differs from network router {}",
                short_addr(configured),
                short_addr(expected)
            ),
            Warning::PoolMismatch {
                on_chain,
                configured,
            } => write!(
                f,
                "on-chain pool {} differs from configured pool {}; using on-chain",
                short_addr(on_chain),
                short_addr(configured)
            ),
            Warning::NoLiquidityPool => f.write_str("no liquidity pool; pool steps skipped"),
            Warning::WalletConflict {
                wallet,
                bound,
                desired,
            } => write!(
                f,
                "{wallet} wallet bound to {}, target {}; left unchanged",
                short_addr(bound),
                short_addr(desired)
            ),
            Warning::VenueNotExcluded { subject, address } => write!(
                f,
                "{subject} ({}) is a trading venue; not excluded from fees",
                short_addr(address)
            ),
        }
    }
}

/// Everything a run produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub profile: NetworkProfile,
    pub pool: Option<Address>,
    pub records: AuditTrail,
    pub failures: Vec<RecoverableFailure>,
    pub warnings: Vec<Warning>,
    pub degraded: DegradedStatus,
    pub checklist: Checklist,
    pub verdict: Verdict,
    pub advisories: Vec<NextStep>,
    /// Set when a fatal failure cut the pipeline short.
    pub aborted: Option<ReconcileError>,
}

impl RunReport {
    pub fn mutation_count(&self) -> usize {
        self.records.mutations().len()
    }
}
