//! Guardrail monitor: hard wall-clock and dollar limits
//!
//! Checked at entry to the evaluate and research stages. Timeout takes
//! priority over cost. Once a limit is recorded on the state it stays set.

use std::time::Instant;
use tracing::warn;

use crate::state::{AgentState, ExceededLimit};

/// Limit tripped for this state, if any
///
/// An already-recorded limit is returned as-is.
pub fn check(state: &AgentState) -> ExceededLimit {
    check_at(state, Instant::now())
}

/// [`check`] against an explicit clock reading
pub fn check_at(state: &AgentState, now: Instant) -> ExceededLimit {
    if state.exceeded_limit.is_set() {
        return state.exceeded_limit;
    }

    if let Some(started_at) = state.started_at {
        let elapsed = now.saturating_duration_since(started_at);
        if elapsed > state.timeout {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                timeout_ms = state.timeout.as_millis() as u64,
                remaining_usd = state.remaining_budget(),
                "Timeout guardrail tripped"
            );
            return ExceededLimit::Timeout;
        }
    }

    if state.cost_spent_usd >= state.cost_ceiling_usd {
        warn!(
            spent = state.cost_spent_usd,
            ceiling = state.cost_ceiling_usd,
            "Cost guardrail tripped"
        );
        return ExceededLimit::Cost;
    }

    ExceededLimit::None
}
