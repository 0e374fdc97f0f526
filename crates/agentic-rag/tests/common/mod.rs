//! Scripted collaborators for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agentic_rag::llm::{CompletionRequest, TokenUsage};
use agentic_rag::{
    Completion, HybridSearch, LlmClient, LlmError, LlmProvider, Orchestrator, ProviderKind,
    ResultRecord, SearchDepth, SearchError, WebSearch,
};

pub const SUFFICIENT: &str = r#"```json
{"is_sufficient": true, "confidence": 0.92, "missing_information": [], "reasoning": "The documents cover it."}
```"#;

pub const INSUFFICIENT: &str = r#"```json
{"is_sufficient": false, "confidence": 0.2, "missing_information": ["current pricing", "release date"], "reasoning": "Nothing relevant."}
```"#;

pub const ANSWER: &str = "RRF merges ranked lists [Internal 1]. It needs no score normalization.";

/// LLM that answers evaluation and generation prompts from fixed scripts
pub struct ScriptedLlm {
    evaluation: Result<String, LlmError>,
    generation: Result<String, LlmError>,
    pub evaluate_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(evaluation: &str, generation: &str) -> Arc<Self> {
        Self::scripted(Ok(evaluation.to_string()), Ok(generation.to_string()))
    }

    pub fn scripted(
        evaluation: Result<String, LlmError>,
        generation: Result<String, LlmError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            evaluation,
            generation,
            evaluate_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
        })
    }

    pub fn evaluate_calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let is_evaluation = request
            .system
            .as_deref()
            .is_some_and(|s| s.contains("Evidence Evaluator"));

        let reply = if is_evaluation {
            self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
            self.evaluation.clone()
        } else {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.generation.clone()
        }?;

        Ok(Completion::new(reply, ProviderKind::OpenAI, "gpt-4o-mini")
            .with_usage(TokenUsage::new(2_000, 300)))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    fn model(&self) -> &str {
        "gpt-4o-mini"
    }
}

/// Hybrid search returning a fixed list
#[derive(Default)]
pub struct MockHybrid {
    pub results: Vec<ResultRecord>,
    pub fail: bool,
    pub panic: bool,
    pub calls: AtomicUsize,
}

impl MockHybrid {
    pub fn with_results(results: Vec<ResultRecord>) -> Arc<Self> {
        Arc::new(Self {
            results,
            ..Default::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            panic: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HybridSearch for MockHybrid {
    async fn search(
        &self,
        _query: &str,
        limit: usize,
        _session: Option<&str>,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("hybrid search exploded");
        }
        if self.fail {
            return Err(SearchError::Backend("index offline".to_string()));
        }
        Ok(self.results.iter().take(limit).cloned().collect())
    }
}

/// Web search returning one result per call, or failing
#[derive(Default)]
pub struct MockWeb {
    pub fail: bool,
    pub queries: Mutex<Vec<String>>,
}

impl MockWeb {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for MockWeb {
    async fn search(
        &self,
        query: &str,
        _max_results: usize,
        _depth: SearchDepth,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        let n = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.to_string());
            queries.len()
        };
        if self.fail {
            return Err(SearchError::RateLimited);
        }
        Ok(vec![ResultRecord::external(
            format!("Result {}", n),
            format!("https://example.com/{}", n),
            "Fresh web evidence.",
        )])
    }
}

pub fn rich_internal() -> Vec<ResultRecord> {
    vec![
        ResultRecord::internal("rrf.md", "Reciprocal rank fusion merges ranked lists.")
            .with_title("RRF"),
        ResultRecord::internal("hybrid.md", "Hybrid search combines lexical and vector retrieval.")
            .with_title("Hybrid search"),
    ]
}

pub fn orchestrator(
    llm: &Arc<ScriptedLlm>,
    hybrid: &Arc<MockHybrid>,
    web: &Arc<MockWeb>,
) -> Orchestrator {
    Orchestrator::new(LlmClient::new(llm.clone()), hybrid.clone(), web.clone())
}
