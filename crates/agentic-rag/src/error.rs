//! Error types for the orchestrator and its collaborators

use thiserror::Error;

/// LLM client errors
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Provider call failed ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("No LLM provider configured")]
    NoProvider,
}

impl LlmError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Search collaborator errors (internal hybrid search and external web search)
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Search backend error: {0}")]
    Backend(String),
}

impl SearchError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::Timeout
                | SearchError::Connection(_)
                | SearchError::RateLimited
                | SearchError::ServerError(_, _)
        )
    }
}

/// Top-level orchestrator errors
///
/// Only failures with no local recovery reach this type; everything the
/// stages can absorb (provider failures, malformed JSON, web search errors)
/// is handled inside the stage.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pipeline task failed: {0}")]
    Task(String),
}
