//! agentic-rag: budget-aware retrieval-augmented generation loop
//!
//! A query runs through a fixed four-stage loop:
//! - Retrieve: internal hybrid search, fused with reciprocal rank fusion
//! - Evaluate: an LLM judges whether the evidence answers the query
//! - Research: web search for the reported gaps, bounded by `max_iterations`
//! - Generate: a cited answer from internal and external evidence
//!
//! Wall-clock and dollar guardrails force early generation. Every LLM call is
//! priced from a static table and added to the query's running cost.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agentic_rag::{AgentConfig, HybridSearcher, LlmClient, MemoryIndex, Orchestrator, TavilyClient, Topic};
//! use agentic_rag::llm::{LlmClientConfig, ProviderKind, ProviderSettings};
//!
//! let llm = LlmClient::from_config(&LlmClientConfig::new(
//!     ProviderSettings::new(ProviderKind::OpenAI).with_api_key("sk-..."),
//! ))?;
//! let index = MemoryIndex::from_json(&std::fs::read_to_string("corpus.json")?)?;
//!
//! let orchestrator = Orchestrator::new(
//!     llm,
//!     Arc::new(HybridSearcher::over_index(&index)),
//!     Arc::new(TavilyClient::new("tvly-...").with_topic(Topic::News)),
//! )
//! .with_config(AgentConfig::default());
//!
//! let response = orchestrator.run("What changed in the 2024 pricing?").await;
//! ```

pub mod config;
pub mod error;
pub mod fusion;
pub mod guardrail;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod router;
pub mod search;
pub mod stages;
pub mod state;
pub mod stream;

// Re-exports for convenience
pub use config::AgentConfig;
pub use error::{LlmError, OrchestratorError, SearchError};
pub use fusion::{fuse, rrf_score, FusedItem, RankedItem, DEFAULT_RRF_K};
pub use llm::{Completion, LlmClient, LlmProvider, ProviderKind};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use router::{route, Stage};
pub use search::{
    Document, HybridSearch, HybridSearcher, MemoryIndex, Ranking, Retriever, SearchDepth,
    TavilyClient, Topic, WebSearch,
};
pub use state::{
    AgentState, Evaluation, ExceededLimit, QueryResponse, ResultRecord, SourceRef, SourceType,
    StateUpdate,
};
pub use stream::{split_sentences, RunSummary, StreamEvent};
