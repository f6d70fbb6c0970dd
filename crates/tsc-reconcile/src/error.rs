use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tsc_config::ValidationFailure;
use tsc_ledger::{LedgerError, Query, ReadFailure};
use tsc_schemas::{short_addr, Address, U256};

use crate::types::Phase;

/// Identity checks run before any mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreflightFailure {
    /// Mutations would be submitted by someone other than the token owner.
    OwnershipMismatch { owner: Address, operator: Address },
    /// The configured helper contract belongs to someone other than the
    /// operator.
    HelperOwnershipMismatch {
        helper: Address,
        owner: Address,
        operator: Address,
    },
    /// The configured helper contract was deployed for a different token.
    HelperTokenMismatch {
        helper: Address,
        helper_token: Address,
        token: Address,
    },
    /// Token name or symbol differs from the configured expectation.
    IdentityMismatch {
        field: String,
        expected: String,
        observed: String,
    },
    InsufficientGasBalance { balance: U256, required: U256 },
    Unreadable(ReadFailure),
}

impl fmt::Display for PreflightFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreflightFailure::OwnershipMismatch { owner, operator } => write!(
                f,
                "operator {} is not the token owner {}",
                short_addr(operator),
                short_addr(owner)
            ),
            PreflightFailure::HelperOwnershipMismatch {
                helper,
                owner,
                operator,
            } => write!(
                f,
                "helper {} is owned by {}, not the operator {}",
                short_addr(helper),
                short_addr(owner),
                short_addr(operator)
            ),
            PreflightFailure::HelperTokenMismatch {
                helper,
                helper_token,
                token,
            } => write!(
                f,
                "helper {} serves token {}, not {}",
                short_addr(helper),
                short_addr(helper_token),
                short_addr(token)
            ),
            PreflightFailure::IdentityMismatch {
                field,
                expected,
                observed,
            } => write!(f, "token {field}: expected '{expected}', observed '{observed}'"),
            PreflightFailure::InsufficientGasBalance { balance, required } => write!(
                f,
                "operator native balance {balance} below required {required}"
            ),
            PreflightFailure::Unreadable(e) => write!(f, "{e}"),
        }
    }
}

/// Fatal run failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileError {
    /// Configuration addresses failed validation. No ledger call was made.
    FatalPrecondition { failures: Vec<ValidationFailure> },
    /// The ledger's network identity could not be read.
    Ledger { query: Query, error: LedgerError },
    Preflight { failure: PreflightFailure },
    /// A phase 1-2 binding could not be established.
    IdentityBindingFailure {
        phase: Phase,
        subject: String,
        expected: String,
        observed: Option<String>,
        reason: String,
    },
    /// The caller's deadline expired. Confirmed effects persist.
    DeadlineExceeded { after: Duration },
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::FatalPrecondition { failures } => {
                write!(f, "invalid configuration ({} address failure(s)): ", failures.len())?;
                let parts: Vec<String> = failures.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join("; "))
            }
            ReconcileError::Ledger { query, error } => write!(f, "ledger {query}: {error}"),
            ReconcileError::Preflight { failure } => write!(f, "preflight failed: {failure}"),
            ReconcileError::IdentityBindingFailure {
                phase,
                subject,
                expected,
                observed,
                reason,
            } => write!(
                f,
                "phase {phase} {subject}: expected {expected}, observed {}: {reason}",
                observed.as_deref().unwrap_or("unknown")
            ),
            ReconcileError::DeadlineExceeded { after } => {
                write!(f, "deadline exceeded after {}s", after.as_secs())
            }
        }
    }
}

impl std::error::Error for ReconcileError {}

impl From<PreflightFailure> for ReconcileError {
    fn from(failure: PreflightFailure) -> Self {
        ReconcileError::Preflight { failure }
    }
}
