//! Search collaborators
//!
//! Two seams, both injected into the orchestrator as trait objects:
//!
//! - [`HybridSearch`]: internal evidence. [`HybridSearcher`] composes any
//!   number of [`Retriever`]s through reciprocal rank fusion.
//! - [`WebSearch`]: external evidence. [`TavilyClient`] is the production
//!   implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::state::ResultRecord;

mod hybrid;
mod memory;
mod tavily;

pub use hybrid::HybridSearcher;
pub use memory::{Document, MemoryIndex, Ranking};
pub use tavily::{TavilyClient, Topic};

/// Search depth for web search
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    /// Fast search with basic results
    #[default]
    Basic,
    /// More thorough search with detailed results
    Advanced,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

/// Internal document search
///
/// An empty result is a valid "no evidence" answer, never an error.
#[async_trait]
pub trait HybridSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        session: Option<&str>,
    ) -> Result<Vec<ResultRecord>, SearchError>;
}

/// External web search
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        depth: SearchDepth,
    ) -> Result<Vec<ResultRecord>, SearchError>;
}

/// One ranked retrieval method feeding [`HybridSearcher`]
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Results in rank order, best first
    async fn retrieve(
        &self,
        query: &str,
        limit: usize,
        session: Option<&str>,
    ) -> Result<Vec<ResultRecord>, SearchError>;

    /// Name for logging
    fn name(&self) -> &str;
}
