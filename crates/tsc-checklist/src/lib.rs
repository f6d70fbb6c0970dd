//! tsc-checklist
//!
//! Readiness scoring over the converged ledger state. Pure: never mutates,
//! never reads the ledger itself, safe to call any number of times.

mod advisories;
mod evaluator;
mod types;

pub use advisories::next_steps;
pub use evaluator::{evaluate, CheckTargets};
pub use types::{CheckStatus, Checklist, NextStep, SecurityCheck, Verdict};

/// Check names, as surfaced to the operator.
pub mod names {
    pub const NOT_DEGRADED: &str = "System NOT in degraded mode";
    pub const ROUTER_TAXED: &str = "Router tax collection enabled";
    pub const POOL_TAXED: &str = "LP tax detection enabled";
    pub const WALLETS_BOUND: &str = "System wallets configured";
    pub const ANTI_BOT: &str = "Anti-bot features active";
    pub const BUY_TAX: &str = "Buy tax system operational";
    pub const ROUTER_COOLDOWN_EXEMPT: &str = "Router cooldown exemption";
    pub const POOL_COOLDOWN_EXEMPT: &str = "LP cooldown exemption";
}
