//! Per-query agent state and the typed patch stages return
//!
//! [`AgentState`] is created once per query and threaded by value through
//! the stages. Stages never mutate it directly: each returns a
//! [`StateUpdate`] naming only the fields it touches, and
//! [`AgentState::apply_update`] merges the patch while enforcing the field
//! invariants (append-only result lists, monotonic counters, a limit flag
//! that is never cleared).

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::AgentConfig;

/// Where a piece of evidence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Hybrid search over the internal document store
    #[default]
    Internal,
    /// External web search
    External,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

/// A single piece of retrieved evidence, internal or external
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Document/chunk key (internal results) or None for web pages
    pub id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    /// Full content or summary used as evidence
    pub content: String,
    /// Relevance score from the producing search (fused RRF score for internal)
    pub score: f64,
    pub source_type: SourceType,
    /// Short excerpt shown alongside citations
    pub snippet: Option<String>,
}

impl ResultRecord {
    /// Create an internal result
    pub fn internal(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            title: None,
            url: None,
            content: content.into(),
            score: 0.0,
            source_type: SourceType::Internal,
            snippet: None,
        }
    }

    /// Create an external result; the snippet is the first 500 characters of content
    pub fn external(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            id: None,
            title: Some(title.into()),
            url: Some(url.into()),
            snippet: Some(truncate_chars(&content, EXTERNAL_SNIPPET_CHARS)),
            content,
            score: 0.0,
            source_type: SourceType::External,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Display label used in prompts and citations
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.id.as_deref())
            .or(self.url.as_deref())
            .unwrap_or("Untitled")
    }
}

/// Characters of external content kept as the citation snippet
pub const EXTERNAL_SNIPPET_CHARS: usize = 500;

/// Characters of internal content kept as the citation snippet
pub const INTERNAL_SNIPPET_CHARS: usize = 200;

/// LLM judgment of whether the collected evidence answers the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub is_sufficient: bool,
    /// Confidence in the judgment (0.0 to 1.0)
    pub confidence: f64,
    pub missing_information: Vec<String>,
    pub reasoning: String,
}

/// Sentinel placed in `missing_information` when the response was unparsable
pub const PARSE_FAILURE_MARKER: &str = "Failed to parse evaluation";

impl Evaluation {
    pub fn new(is_sufficient: bool, confidence: f64) -> Self {
        Self {
            is_sufficient,
            confidence: clamp_confidence(confidence),
            missing_information: Vec::new(),
            reasoning: String::new(),
        }
    }

    pub fn with_missing(mut self, missing: Vec<String>) -> Self {
        self.missing_information = missing;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Default for a response that could not be parsed: keep researching
    pub fn parse_failure(raw: &str) -> Self {
        Self::new(false, 0.5)
            .with_missing(vec![PARSE_FAILURE_MARKER.to_string()])
            .with_reasoning(truncate_chars(raw, 200))
    }

    /// Default for a failed LLM call: stop researching
    pub fn fail_open(error: impl std::fmt::Display) -> Self {
        Self::new(true, 0.5).with_reasoning(format!("Evaluation failed: {}", error))
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.5
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Which hard limit, if any, has been tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExceededLimit {
    #[default]
    None,
    Timeout,
    Cost,
}

impl ExceededLimit {
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Timeout => "timeout",
            Self::Cost => "cost",
        }
    }
}

/// A citation attached to the final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl SourceRef {
    /// Build a citation from a result, tagged with the given origin
    pub fn from_result(record: &ResultRecord, source_type: SourceType) -> Self {
        let snippet = record.snippet.clone().or_else(|| {
            (!record.content.is_empty())
                .then(|| truncate_chars(&record.content, INTERNAL_SNIPPET_CHARS))
        });

        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            url: record.url.clone(),
            source_type,
            snippet,
        }
    }
}

/// State for a single query run
#[derive(Debug, Clone)]
pub struct AgentState {
    /// The user's query
    pub query: String,

    /// Results from hybrid search (retrieve stage)
    pub internal_results: Vec<ResultRecord>,

    /// Results from web search, cumulative across research iterations
    pub external_results: Vec<ResultRecord>,

    /// Latest sufficiency evaluation
    pub evaluation: Option<Evaluation>,

    /// Research invocations so far, successful or not
    pub research_iterations: u32,

    pub max_iterations: u32,

    /// Creation instant; None disables the timeout check
    pub started_at: Option<Instant>,

    pub timeout: Duration,

    pub cost_ceiling_usd: f64,

    pub cost_spent_usd: f64,

    pub exceeded_limit: ExceededLimit,

    pub final_answer: Option<String>,

    /// Citations, internal first then external
    pub sources: Vec<SourceRef>,

    pub error: Option<String>,
}

impl AgentState {
    /// Create a fresh state for a query, starting the wall clock now
    pub fn new(query: impl Into<String>, config: &AgentConfig) -> Self {
        Self {
            query: query.into(),
            internal_results: Vec::new(),
            external_results: Vec::new(),
            evaluation: None,
            research_iterations: 0,
            max_iterations: config.max_iterations,
            started_at: Some(Instant::now()),
            timeout: config.timeout,
            cost_ceiling_usd: config.cost_ceiling_usd,
            cost_spent_usd: 0.0,
            exceeded_limit: ExceededLimit::None,
            final_answer: None,
            sources: Vec::new(),
            error: None,
        }
    }

    /// Override the start instant (None disables the timeout check)
    pub fn with_started_at(mut self, started_at: Option<Instant>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Pre-seed spent cost, e.g. when a caller shares a budget across steps
    pub fn with_cost_spent(mut self, usd: f64) -> Self {
        self.cost_spent_usd = usd.max(0.0);
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Remaining dollar budget, never negative
    pub fn remaining_budget(&self) -> f64 {
        (self.cost_ceiling_usd - self.cost_spent_usd).max(0.0)
    }

    /// Split `sources` into (internal, external)
    pub fn partition_sources(&self) -> (Vec<SourceRef>, Vec<SourceRef>) {
        self.sources
            .iter()
            .cloned()
            .partition(|s| s.source_type == SourceType::Internal)
    }

    /// Merge a stage's patch into the state
    pub fn apply_update(mut self, update: StateUpdate) -> Self {
        self.internal_results.extend(update.new_internal_results);
        self.external_results.extend(update.new_external_results);

        if let Some(evaluation) = update.evaluation {
            self.evaluation = Some(evaluation);
        }

        self.research_iterations += update.research_iterations;

        // Negative or NaN deltas are dropped so spent cost never decreases
        if update.cost_usd > 0.0 {
            self.cost_spent_usd += update.cost_usd;
        }

        if let Some(limit) = update.exceeded_limit {
            if !self.exceeded_limit.is_set() {
                self.exceeded_limit = limit;
            }
        }

        if let Some(answer) = update.final_answer {
            self.final_answer = Some(answer);
        }

        if let Some(sources) = update.sources {
            self.sources = sources;
        }

        if let Some(error) = update.error {
            self.error = Some(error);
        }

        self
    }
}

/// Patch returned by a stage
///
/// Every field is optional or additive; an empty update leaves the state
/// untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub new_internal_results: Vec<ResultRecord>,
    pub new_external_results: Vec<ResultRecord>,
    pub evaluation: Option<Evaluation>,
    /// Research iterations to add
    pub research_iterations: u32,
    /// Cost to add to the running total
    pub cost_usd: f64,
    pub exceeded_limit: Option<ExceededLimit>,
    pub final_answer: Option<String>,
    pub sources: Option<Vec<SourceRef>>,
    pub error: Option<String>,
}

impl StateUpdate {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.new_internal_results.is_empty()
            && self.new_external_results.is_empty()
            && self.evaluation.is_none()
            && self.research_iterations == 0
            && self.cost_usd == 0.0
            && self.exceeded_limit.is_none()
            && self.final_answer.is_none()
            && self.sources.is_none()
            && self.error.is_none()
    }

    pub fn with_internal_results(mut self, results: Vec<ResultRecord>) -> Self {
        self.new_internal_results = results;
        self
    }

    pub fn with_external_results(mut self, results: Vec<ResultRecord>) -> Self {
        self.new_external_results = results;
        self
    }

    pub fn with_evaluation(mut self, evaluation: Evaluation) -> Self {
        self.evaluation = Some(evaluation);
        self
    }

    /// Record one research invocation
    pub fn with_research_iteration(mut self) -> Self {
        self.research_iterations += 1;
        self
    }

    pub fn with_cost(mut self, usd: f64) -> Self {
        self.cost_usd += usd;
        self
    }

    pub fn with_exceeded_limit(mut self, limit: ExceededLimit) -> Self {
        if limit.is_set() {
            self.exceeded_limit = Some(limit);
        }
        self
    }

    pub fn with_final_answer(mut self, answer: impl Into<String>) -> Self {
        self.final_answer = Some(answer.into());
        self
    }

    pub fn with_sources(mut self, sources: Vec<SourceRef>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Terminal record returned by the synchronous entrypoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub final_answer: Option<String>,
    pub sources: Vec<SourceRef>,
    pub research_iterations: u32,
    pub cost_spent_usd: f64,
    pub cost_ceiling_usd: f64,
    pub exceeded_limit: ExceededLimit,
    pub error: Option<String>,
}

impl From<AgentState> for QueryResponse {
    fn from(state: AgentState) -> Self {
        Self {
            query: state.query,
            final_answer: state.final_answer,
            sources: state.sources,
            research_iterations: state.research_iterations,
            cost_spent_usd: state.cost_spent_usd,
            cost_ceiling_usd: state.cost_ceiling_usd,
            exceeded_limit: state.exceeded_limit,
            error: state.error,
        }
    }
}

/// Truncate to at most `max` characters on a char boundary
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AgentState {
        AgentState::new("what is rrf?", &AgentConfig::default())
    }

    #[test]
    fn test_agent_state_new() {
        let state = state();

        assert_eq!(state.query, "what is rrf?");
        assert!(state.internal_results.is_empty());
        assert!(state.external_results.is_empty());
        assert!(state.evaluation.is_none());
        assert_eq!(state.research_iterations, 0);
        assert_eq!(state.max_iterations, 2);
        assert_eq!(state.exceeded_limit, ExceededLimit::None);
        assert!(state.started_at.is_some());
        assert!(state.final_answer.is_none());
    }

    #[test]
    fn test_external_results_are_appended() {
        let state = state()
            .apply_update(StateUpdate::empty().with_external_results(vec![
                ResultRecord::external("A", "https://a.com", "alpha"),
            ]))
            .apply_update(StateUpdate::empty().with_external_results(vec![
                ResultRecord::external("B", "https://b.com", "beta"),
            ]));

        assert_eq!(state.external_results.len(), 2);
        assert_eq!(state.external_results[0].label(), "A");
        assert_eq!(state.external_results[1].label(), "B");
    }

    #[test]
    fn test_exceeded_limit_is_never_cleared_or_replaced() {
        let state = state()
            .apply_update(StateUpdate::empty().with_exceeded_limit(ExceededLimit::Timeout))
            .apply_update(StateUpdate::empty().with_exceeded_limit(ExceededLimit::Cost))
            .apply_update(StateUpdate::empty().with_exceeded_limit(ExceededLimit::None));

        assert_eq!(state.exceeded_limit, ExceededLimit::Timeout);
    }

    #[test]
    fn test_cost_never_decreases() {
        let state = state()
            .apply_update(StateUpdate::empty().with_cost(0.02))
            .apply_update(StateUpdate::empty().with_cost(-1.0))
            .apply_update(StateUpdate::empty().with_cost(f64::NAN));

        assert!((state.cost_spent_usd - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_remaining_budget_never_negative() {
        let config = AgentConfig::default().with_cost_ceiling(0.50);
        let state = AgentState::new("q", &config).with_cost_spent(0.20);
        assert!((state.remaining_budget() - 0.30).abs() < 1e-12);

        let overspent = AgentState::new("q", &config).with_cost_spent(0.75);
        assert_eq!(overspent.remaining_budget(), 0.0);
    }

    #[test]
    fn test_research_iterations_accumulate() {
        let state = state()
            .apply_update(StateUpdate::empty().with_research_iteration())
            .apply_update(StateUpdate::empty().with_research_iteration());

        assert_eq!(state.research_iterations, 2);
    }

    #[test]
    fn test_empty_update_is_noop() {
        let update = StateUpdate::empty();
        assert!(update.is_empty());
        assert!(!StateUpdate::empty().with_research_iteration().is_empty());

        let before = state();
        let after = before.clone().apply_update(update);
        assert_eq!(after.research_iterations, before.research_iterations);
        assert_eq!(after.cost_spent_usd, before.cost_spent_usd);
        assert!(after.evaluation.is_none());
    }

    #[test]
    fn test_external_snippet_truncated_to_500_chars() {
        let content = "é".repeat(800);
        let record = ResultRecord::external("T", "https://t.com", content.clone());

        assert_eq!(record.snippet.as_ref().unwrap().chars().count(), 500);
        assert_eq!(record.content, content);
        assert_eq!(record.source_type, SourceType::External);
    }

    #[test]
    fn test_evaluation_defaults() {
        let parse = Evaluation::parse_failure("not json at all");
        assert!(!parse.is_sufficient);
        assert_eq!(parse.confidence, 0.5);
        assert_eq!(parse.missing_information, vec![PARSE_FAILURE_MARKER.to_string()]);
        assert_eq!(parse.reasoning, "not json at all");

        let failed = Evaluation::fail_open("boom");
        assert!(failed.is_sufficient);
        assert_eq!(failed.confidence, 0.5);
        assert!(failed.reasoning.contains("boom"));
    }

    #[test]
    fn test_confidence_clamping() {
        assert_eq!(Evaluation::new(true, 1.7).confidence, 1.0);
        assert_eq!(Evaluation::new(true, -0.2).confidence, 0.0);
        assert_eq!(Evaluation::new(true, f64::NAN).confidence, 0.5);
    }

    #[test]
    fn test_partition_sources_and_response() {
        let internal = ResultRecord::internal("doc-1", "internal evidence").with_title("Doc 1");
        let external = ResultRecord::external("Web", "https://web.com", "external evidence");

        let state = state().apply_update(StateUpdate::empty().with_sources(vec![
            SourceRef::from_result(&internal, SourceType::Internal),
            SourceRef::from_result(&external, SourceType::External),
        ]));

        let (int, ext) = state.partition_sources();
        assert_eq!(int.len(), 1);
        assert_eq!(ext.len(), 1);
        assert_eq!(int[0].snippet.as_deref(), Some("internal evidence"));

        let response = QueryResponse::from(state);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["exceeded_limit"], "none");
        assert_eq!(json["sources"][0]["source_type"], "internal");
        assert_eq!(json["sources"][1]["source_type"], "external");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 5), "");
    }
}
