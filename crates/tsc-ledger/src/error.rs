use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Query;

/// Errors a [`crate::Ledger`] implementation may return.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerError {
    /// Connection or RPC failure; the operation may or may not have landed.
    Transport(String),
    /// The ledger rejected the operation.
    Reverted { op: String, reason: String },
    /// Another mutation from the same sender is still outstanding.
    NonceConflict { pending: u64 },
    /// `wait_confirmed` was called with a handle the ledger does not know.
    UnknownOperation(String),
    /// The implementation does not support this call.
    Unsupported(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Transport(msg) => write!(f, "transport error: {msg}"),
            LedgerError::Reverted { op, reason } => write!(f, "{op} reverted: {reason}"),
            LedgerError::NonceConflict { pending } => {
                write!(f, "nonce conflict: operation with nonce {pending} still pending")
            }
            LedgerError::UnknownOperation(id) => write!(f, "unknown operation handle {id}"),
            LedgerError::Unsupported(what) => write!(f, "unsupported: {what}"),
        }
    }
}

impl std::error::Error for LedgerError {}

/// One query of a snapshot failed. The rest of the snapshot is still usable;
/// callers decide whether the missing field matters to them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFailure {
    pub query: Query,
    pub reason: String,
}

impl ReadFailure {
    pub fn new(query: Query, err: &LedgerError) -> Self {
        Self {
            query,
            reason: err.to_string(),
        }
    }

    /// The field was outside the snapshot's read scope.
    pub fn not_read(query: Query) -> Self {
        Self {
            query,
            reason: "not part of this snapshot".to_string(),
        }
    }
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "read failed: {}: {}", self.query, self.reason)
    }
}

impl std::error::Error for ReadFailure {}
