use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    /// An input could not be read. Counts as failing for the verdict.
    Unknown,
}

impl CheckStatus {
    pub fn from_bool(passed: bool) -> Self {
        if passed {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCheck {
    pub name: String,
    pub status: CheckStatus,
    pub critical: bool,
    /// Why the status is not PASS (read failure, offending value).
    pub detail: Option<String>,
}

impl SecurityCheck {
    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

/// Ordered check results.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub checks: Vec<SecurityCheck>,
}

impl Checklist {
    /// Critical checks that did not pass, in checklist order.
    pub fn critical_failures(&self) -> Vec<&SecurityCheck> {
        self.checks
            .iter()
            .filter(|c| c.critical && !c.passed())
            .collect()
    }

    /// READY iff every critical check passes. Non-critical results never
    /// affect the verdict.
    pub fn verdict(&self) -> Verdict {
        let reasons: Vec<String> = self
            .critical_failures()
            .into_iter()
            .map(|c| c.name.clone())
            .collect();
        if reasons.is_empty() {
            Verdict::Ready
        } else {
            Verdict::NotReady { reasons }
        }
    }

    pub fn get(&self, name: &str) -> Option<&SecurityCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Ready,
    /// Failing critical check names, verbatim.
    NotReady { reasons: Vec<String> },
}

impl Verdict {
    pub fn is_ready(&self) -> bool {
        matches!(self, Verdict::Ready)
    }

    /// Force NOT-READY, keeping existing reasons.
    pub fn not_ready_because(self, reason: String) -> Self {
        match self {
            Verdict::Ready => Verdict::NotReady {
                reasons: vec![reason],
            },
            Verdict::NotReady { mut reasons } => {
                reasons.push(reason);
                Verdict::NotReady { reasons }
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Ready => f.write_str("READY"),
            Verdict::NotReady { .. } => f.write_str("NOT-READY"),
        }
    }
}

/// Operator follow-up derived from the final state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum NextStep {
    /// Trading stays disabled until the ledger leaves degraded mode.
    ResolveDegradedMode { active_minutes: Option<i64> },
    /// Create and register the liquidity pool, then complete setup.
    CreateLiquidityPool,
    CompleteSetup,
    EnableTrading,
    AllComplete,
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStep::ResolveDegradedMode {
                active_minutes: Some(m),
            } => write!(
                f,
                "degraded mode active for {m} min: check the helper contract binding and its health"
            ),
            NextStep::ResolveDegradedMode {
                active_minutes: None,
            } => f.write_str("degraded mode active: check the helper contract binding and its health"),
            NextStep::CreateLiquidityPool => f.write_str(
                "create the liquidity pool, add and lock liquidity, register the pool, then complete setup",
            ),
            NextStep::CompleteSetup => f.write_str("complete setup on the token contract"),
            NextStep::EnableTrading => f.write_str("enable trading once small test transfers pass"),
            NextStep::AllComplete => f.write_str("setup complete"),
        }
    }
}
