//! tsc-reconcile
//!
//! Converges the token's on-chain configuration to a target configuration.
//!
//! - Fixed phase order: helper binding, wallet bindings, venue (router/pool)
//!   fee and cooldown settings, system-address exclusions, feature flags,
//!   treasury funding, then optional setup completion.
//! - Every step reads the current value fresh, mutates only on mismatch, and
//!   waits for confirmation before anything that may depend on it.
//! - Phases 1-2 failing aborts the pipeline. Per-address, feature and funding
//!   failures are accumulated and the run continues.
//! - The run always ends in a checklist and verdict once a network profile
//!   has been resolved.

mod controller;
mod engine;
mod error;
mod funding;
mod guard;
mod preflight;
mod step;
mod types;

pub use controller::{Controller, RunOptions};
pub use engine::ReconciliationEngine;
pub use error::{PreflightFailure, ReconcileError};
pub use funding::FundingAllocator;
pub use guard::{DegradedModeGuard, DegradedStatus};
pub use preflight::{preflight, PreflightReport};
pub use step::{ReconciliationStep, Rule, Setting, SettingValue};
pub use types::{AuditTrail, Outcome, Phase, PhaseRecord, RecoverableFailure, RunReport, Warning};
