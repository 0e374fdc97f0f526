//! # Tools Module
//!
//! Keyless web search via DuckDuckGo's HTML endpoint, used for the research
//! stage when no Tavily key is configured.

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use agentic_rag::{ResultRecord, SearchDepth, SearchError, WebSearch};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// =============================================================================
// CUSTOM ERROR TYPE
// =============================================================================
#[derive(Error, Debug)]
pub enum DuckDuckGoError {
    #[error("Failed to perform web search: {0}")]
    SearchFailed(String),

    #[error("Rate limited by search provider, please wait")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl From<DuckDuckGoError> for SearchError {
    fn from(err: DuckDuckGoError) -> Self {
        match err {
            DuckDuckGoError::RateLimited => SearchError::RateLimited,
            DuckDuckGoError::SearchFailed(message) => SearchError::Backend(message),
            DuckDuckGoError::NetworkError(e) if e.is_timeout() => SearchError::Timeout,
            DuckDuckGoError::NetworkError(e) => SearchError::Network(e.to_string()),
        }
    }
}

// =============================================================================
// WEB SEARCH
// =============================================================================
/// DuckDuckGo HTML search
///
/// Search depth has no DuckDuckGo equivalent and is ignored.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    base_url: String,
    /// Pause before each request to stay under DuckDuckGo's rate limit
    request_delay: Duration,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self, DuckDuckGoError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_delay: Duration::from_millis(500),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    async fn fetch(&self, query: &str) -> Result<String, DuckDuckGoError> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let url = format!("{}/html/?q={}", self.base_url, urlencoding::encode(query));
        debug!(url = %url, "Fetching search results");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(DuckDuckGoError::RateLimited);
            }
            return Err(DuckDuckGoError::SearchFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        _depth: SearchDepth,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        info!(query = %query, "Performing web search");

        let html = self.fetch(query).await?;
        let results = parse_html(&html, max_results);

        if results.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            info!(query = %query, count = results.len(), "Search completed");
        }

        Ok(results)
    }
}

// =============================================================================
// HTML PARSING
// =============================================================================
/// Extract results from a DuckDuckGo HTML page.
///
/// Result blocks (`result__a` link plus `result__snippet`) are preferred;
/// if none are found, any redirect links on the page are used with their
/// domain as the title.
fn parse_html(html: &str, max_results: usize) -> Vec<ResultRecord> {
    let mut seen_urls = HashSet::new();
    let mut results = Vec::new();

    for block in html.split("class=\"result__a\"").skip(1) {
        if results.len() >= max_results {
            break;
        }

        let Some(url) = attribute(block, "href=\"").and_then(resolve_url) else {
            continue;
        };
        if !seen_urls.insert(url.clone()) {
            continue;
        }

        let title = element_text(block)
            .filter(|t| !t.is_empty())
            .or_else(|| extract_domain(&url))
            .unwrap_or_else(|| "Result".to_string());

        let snippet = block
            .split_once("result__snippet")
            .and_then(|(_, rest)| element_text(rest))
            .unwrap_or_default();

        results.push(ResultRecord::external(title, url, snippet));
    }

    if results.is_empty() {
        for segment in html.split("uddg=").skip(1) {
            if results.len() >= max_results {
                break;
            }

            let Some(url) = decode_redirect(segment) else {
                continue;
            };
            if seen_urls.insert(url.clone()) {
                let title = extract_domain(&url).unwrap_or_else(|| "Result".to_string());
                results.push(ResultRecord::external(title, url, ""));
            }
        }
    }

    results
}

/// Value of the first `marker"..."` attribute in `fragment`
fn attribute<'a>(fragment: &'a str, marker: &str) -> Option<&'a str> {
    let start = fragment.find(marker)? + marker.len();
    let rest = &fragment[start..];
    Some(&rest[..rest.find('"')?])
}

/// Turn a result href into the target URL, skipping DuckDuckGo's own links
fn resolve_url(href: &str) -> Option<String> {
    let url = match href.split_once("uddg=") {
        Some((_, encoded)) => decode_redirect(encoded)?,
        None if href.starts_with("//") => format!("https:{}", href),
        None if href.starts_with("http") => href.to_string(),
        None => return None,
    };

    (!url.contains("duckduckgo.com")).then_some(url)
}

fn decode_redirect(encoded: &str) -> Option<String> {
    let end = encoded
        .find(|c: char| c == '&' || c == '"' || c == '\'')
        .unwrap_or(encoded.len());
    let url = urlencoding::decode(&encoded[..end]).ok()?.into_owned();

    (url.starts_with("http") && !url.contains("duckduckgo.com")).then_some(url)
}

/// Text content of the element whose opening tag `fragment` is inside
fn element_text(fragment: &str) -> Option<String> {
    let start = fragment.find('>')? + 1;
    let rest = &fragment[start..];
    let end = rest.find("</a>").or_else(|| rest.find("</div>"))?;
    Some(clean_text(&rest[..end]))
}

/// Strip tags, decode common entities and collapse whitespace
fn clean_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    let text = text
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the domain name from a URL.
fn extract_domain(url: &str) -> Option<String> {
    url.split("//")
        .nth(1)?
        .split('/')
        .next()
        .map(|s| s.to_string())
}
