//! Orchestrator configuration
//!
//! Budgets and bounds for a single query run. One `AgentConfig` is shared
//! read-only by every query an [`Orchestrator`](crate::Orchestrator) serves;
//! each query copies the values it needs into its own
//! [`AgentState`](crate::AgentState) at creation time.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use agentic_rag::AgentConfig;
//!
//! let config = AgentConfig::default()
//!     .with_max_iterations(3)
//!     .with_timeout(Duration::from_secs(30))
//!     .with_cost_ceiling(0.25);
//!
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::OrchestratorError;
use crate::fusion::DEFAULT_RRF_K;
use crate::search::SearchDepth;

/// Budgets and bounds for the agent loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of research iterations before generation is forced
    pub max_iterations: u32,

    /// Wall-clock budget measured from state creation
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Dollar budget for LLM calls
    pub cost_ceiling_usd: f64,

    /// Number of internal results requested from hybrid search
    pub retrieval_limit: usize,

    /// Number of results requested per web search
    pub research_max_results: usize,

    /// Web search depth
    pub research_depth: SearchDepth,

    /// RRF smoothing constant used by hybrid search
    pub rrf_k: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            timeout: Duration::from_secs(60),
            cost_ceiling_usd: 0.50,
            retrieval_limit: 10,
            research_max_results: 5,
            research_depth: SearchDepth::Basic,
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cost_ceiling(mut self, usd: f64) -> Self {
        self.cost_ceiling_usd = usd;
        self
    }

    pub fn with_retrieval_limit(mut self, limit: usize) -> Self {
        self.retrieval_limit = limit;
        self
    }

    pub fn with_research_max_results(mut self, max: usize) -> Self {
        self.research_max_results = max;
        self
    }

    pub fn with_research_depth(mut self, depth: SearchDepth) -> Self {
        self.research_depth = depth;
        self
    }

    /// Reject budgets the loop cannot honour
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.timeout.is_zero() {
            return Err(OrchestratorError::Config(
                "timeout must be greater than zero".to_string(),
            ));
        }

        if !self.cost_ceiling_usd.is_finite() || self.cost_ceiling_usd < 0.0 {
            return Err(OrchestratorError::Config(format!(
                "cost ceiling must be a non-negative amount, got: {}",
                self.cost_ceiling_usd
            )));
        }

        if self.retrieval_limit == 0 {
            return Err(OrchestratorError::Config(
                "retrieval limit must be at least 1".to_string(),
            ));
        }

        if self.research_max_results == 0 {
            return Err(OrchestratorError::Config(
                "research max results must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
