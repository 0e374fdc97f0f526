//! Tavily web search client
//!
//! Production [`WebSearch`] implementation backed by the Tavily Search API.
//!
//! - HTTP timeout and retry with exponential backoff on transient errors
//! - Typed errors for rate limits, auth failures and server errors
//! - Configurable base URL so tests can point it at a mock server

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{SearchDepth, WebSearch};
use crate::error::SearchError;
use crate::state::{truncate_chars, ResultRecord};

/// Default timeout for Tavily API requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 1000;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Tavily rejects longer queries
const MAX_QUERY_CHARS: usize = 400;

/// Tavily caps results per request
const MAX_RESULTS: usize = 20;

/// Topic filter for Tavily API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// General web search
    #[default]
    General,
    /// Recent news articles
    News,
}

impl Topic {
    fn as_str(&self) -> &'static str {
        match self {
            Topic::General => "general",
            Topic::News => "news",
        }
    }
}

/// Tavily Search client
///
/// # Example
/// ```ignore
/// let tavily = TavilyClient::new("tvly-...").with_max_retries(1);
/// let results = tavily.search("Rust async runtimes", 5, SearchDepth::Basic).await?;
/// ```
#[derive(Clone)]
pub struct TavilyClient {
    api_key: String,
    client: Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    topic: Topic,
}

impl TavilyClient {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            topic: Topic::General,
        }
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set custom max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay of the exponential backoff
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Restrict results to a topic (general web or news)
    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = topic;
        self
    }

    /// Execute HTTP request with retry and backoff
    async fn execute_with_retry(
        &self,
        request: &TavilyRequest,
    ) -> Result<TavilyResponse, SearchError> {
        let mut last_error = SearchError::Backend("No attempts made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base_delay * 2u32.pow(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying Tavily request");
                tokio::time::sleep(delay).await;
            }

            match self.execute_single_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    // Only retry on transient errors
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    warn!(attempt, error = %e, "Tavily request failed, will retry");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Execute a single HTTP request
    async fn execute_single_request(
        &self,
        request: &TavilyRequest,
    ) -> Result<TavilyResponse, SearchError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else if e.is_connect() {
                    SearchError::Connection(e.to_string())
                } else {
                    SearchError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| SearchError::ParseError(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(SearchError::Unauthorized),
            429 => Err(SearchError::RateLimited),
            400 => Err(SearchError::BadRequest(error_text)),
            500..=599 => Err(SearchError::ServerError(status.as_u16(), error_text)),
            _ => Err(SearchError::HttpError(status.as_u16(), error_text)),
        }
    }
}

impl std::fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("topic", &self.topic)
            .finish()
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        depth: SearchDepth,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        let request = TavilyRequest {
            query: truncate_chars(query, MAX_QUERY_CHARS),
            max_results: max_results.clamp(1, MAX_RESULTS),
            search_depth: depth.as_str().to_string(),
            topic: self.topic.as_str().to_string(),
            include_answer: false,
            include_raw_content: false,
        };

        let response = self.execute_with_retry(&request).await?;
        debug!(query = %request.query, count = response.results.len(), "Tavily search completed");

        Ok(response
            .results
            .into_iter()
            .map(TavilyResult::into_record)
            .collect())
    }
}

/// Request body for Tavily API
#[derive(Debug, Serialize)]
struct TavilyRequest {
    query: String,
    max_results: usize,
    search_depth: String,
    topic: String,
    include_answer: bool,
    include_raw_content: bool,
}

/// Response from Tavily API
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    /// Search results
    #[serde(default)]
    results: Vec<TavilyResult>,
}

/// Individual search result
#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    /// Extracted content/snippet
    #[serde(default)]
    content: String,
    /// Relevance score (0-1)
    #[serde(default)]
    score: f64,
}

impl TavilyResult {
    fn into_record(self) -> ResultRecord {
        ResultRecord::external(self.title, self.url, self.content).with_score(self.score)
    }
}
