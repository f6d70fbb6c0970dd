use tsc_ledger::ObservedState;
use tsc_schemas::Address;

use crate::types::NextStep;

/// Follow-up for the operator, most urgent first.
///
/// Degraded mode masks everything else. Otherwise the pool, then setup
/// completion, then trading. Unreadable inputs are treated as "not done".
pub fn next_steps(state: &ObservedState, pool: Option<Address>) -> Vec<NextStep> {
    if !matches!(state.degraded_mode, Ok(false)) {
        return vec![NextStep::ResolveDegradedMode {
            active_minutes: state.degraded_minutes(),
        }];
    }

    let mut out = Vec::new();
    if pool.is_none() {
        out.push(NextStep::CreateLiquidityPool);
    } else if !matches!(state.setup_completed, Ok(true)) {
        out.push(NextStep::CompleteSetup);
    }
    if !matches!(state.trading_enabled, Ok(true)) {
        out.push(NextStep::EnableTrading);
    }
    if out.is_empty() {
        out.push(NextStep::AllComplete);
    }
    out
}
