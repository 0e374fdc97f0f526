//! Stage routing
//!
//! The loop has a fixed shape:
//!
//! ```text
//! retrieve ─▶ evaluate ─┬─▶ generate ─▶ (done)
//!                ▲      │
//!                └─ research ◀┘
//! ```
//!
//! [`route`] is the only decision point; every other transition is fixed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::AgentState;

/// One of the four pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Retrieve,
    Evaluate,
    Research,
    Generate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Retrieve => "retrieve",
            Stage::Evaluate => "evaluate",
            Stage::Research => "research",
            Stage::Generate => "generate",
        }
    }

    /// Human-readable progress line for this stage
    pub fn description(&self) -> &'static str {
        match self {
            Stage::Retrieve => "Searching internal documents",
            Stage::Evaluate => "Evaluating whether the evidence answers the question",
            Stage::Research => "Searching the web for missing information",
            Stage::Generate => "Writing the answer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide what follows an evaluation. First match wins.
pub fn route(state: &AgentState) -> Stage {
    if state.exceeded_limit.is_set() {
        return Stage::Generate;
    }

    let Some(evaluation) = &state.evaluation else {
        return Stage::Generate;
    };

    if evaluation.is_sufficient || state.research_iterations >= state.max_iterations {
        return Stage::Generate;
    }

    Stage::Research
}

/// Stage after `current`, or None once generation has run
pub fn next_stage(current: Stage, state: &AgentState) -> Option<Stage> {
    match current {
        Stage::Retrieve => Some(Stage::Evaluate),
        Stage::Evaluate => Some(route(state)),
        Stage::Research => Some(Stage::Evaluate),
        Stage::Generate => None,
    }
}
