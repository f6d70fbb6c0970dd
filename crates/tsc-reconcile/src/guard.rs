//! Degraded-mode guard.
//!
//! The ledger trips degraded mode on its own whenever the helper binding is
//! missing or unhealthy, and only the ledger can lift it. Binding the helper
//! is the one action expected to clear it. The guard never tries to clear
//! anything: it observes before the run, re-reads after the helper phase,
//! and reports.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use tsc_ledger::{Ledger, ObservedState, ObservedStateReader};

use crate::types::{RecoverableFailure, Warning};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedStatus {
    /// At run start. `None` if unreadable.
    pub before: Option<bool>,
    /// Minutes active at run start, when known.
    pub active_minutes: Option<i64>,
    /// Re-read after the helper binding phase. `None` if that phase did not
    /// complete or the read failed.
    pub after_helper: Option<bool>,
    /// Still active after the helper phase.
    pub unresolved: bool,
}

#[derive(Debug, Default)]
pub struct DegradedModeGuard {
    status: DegradedStatus,
}

impl DegradedModeGuard {
    /// Observe the starting snapshot. Degraded at start is a warning only;
    /// the run proceeds because phase 1 is what should clear it.
    pub fn observe_start(state: &ObservedState) -> (Self, Option<Warning>) {
        let before = state.degraded_mode.as_ref().ok().copied();
        let active_minutes = state.degraded_minutes();
        let warning = (before == Some(true)).then(|| {
            warn!(active_minutes = ?active_minutes, "degraded mode active at start; helper binding expected to clear it");
            Warning::DegradedAtStart { active_minutes }
        });
        let guard = Self {
            status: DegradedStatus {
                before,
                active_minutes,
                ..DegradedStatus::default()
            },
        };
        (guard, warning)
    }

    /// Fresh read after phase 1.
    pub async fn check_after_helper<L: Ledger + ?Sized>(
        &mut self,
        reader: &ObservedStateReader<'_, L>,
    ) -> Option<RecoverableFailure> {
        match reader.degraded_mode().await {
            Ok(false) => {
                if self.status.before == Some(true) {
                    info!("degraded mode cleared after helper binding");
                }
                self.status.after_helper = Some(false);
                None
            }
            Ok(true) => {
                error!("degraded mode still active after helper binding; cannot be cleared from here");
                self.status.after_helper = Some(true);
                self.status.unresolved = true;
                Some(RecoverableFailure::UnresolvedDegradedMode {
                    active_minutes: self.status.active_minutes,
                })
            }
            Err(e) => Some(RecoverableFailure::Read(e)),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.status.unresolved
    }

    pub fn status(&self) -> &DegradedStatus {
        &self.status
    }

    pub fn into_status(self) -> DegradedStatus {
        self.status
    }
}
