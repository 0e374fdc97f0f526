//! Orchestrator: drives one query through the stage loop
//!
//! ```text
//! retrieve ─▶ evaluate ─▶ route ─┬─▶ research ─▶ evaluate ─▶ ...
//!                                └─▶ generate ─▶ QueryResponse
//! ```
//!
//! The orchestrator only holds shared, read-only collaborators and is cheap
//! to clone; all per-query data lives in the [`AgentState`] owned by one run.

use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::error::OrchestratorError;
use crate::llm::LlmClient;
use crate::router::{next_stage, Stage};
use crate::search::{HybridSearch, WebSearch};
use crate::stages;
use crate::state::{AgentState, QueryResponse};

/// Result of driving a state to completion
#[derive(Debug)]
pub struct RunOutcome {
    /// State as of the last merged update
    pub state: AgentState,
    /// Set when the loop was aborted before generation
    pub failure: Option<OrchestratorError>,
}

impl RunOutcome {
    pub fn into_response(self) -> QueryResponse {
        let mut response = QueryResponse::from(self.state);
        if let Some(failure) = self.failure {
            response.final_answer = None;
            response.error = Some(failure.to_string());
        }
        response
    }
}

/// Agentic RAG orchestrator
#[derive(Clone)]
pub struct Orchestrator {
    llm: LlmClient,
    hybrid: Arc<dyn HybridSearch>,
    web: Arc<dyn WebSearch>,
    config: AgentConfig,
}

impl Orchestrator {
    pub fn new(llm: LlmClient, hybrid: Arc<dyn HybridSearch>, web: Arc<dyn WebSearch>) -> Self {
        Self {
            llm,
            hybrid,
            web,
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    /// Fresh state for a query, clock started now
    pub fn new_state(&self, query: impl Into<String>) -> AgentState {
        AgentState::new(query, &self.config)
    }

    /// Answer a query and return the terminal record
    pub async fn run(&self, query: &str) -> QueryResponse {
        self.run_state(self.new_state(query), None).await
    }

    /// [`run`](Self::run) scoped to a session's documents
    pub async fn run_with_session(&self, query: &str, session: Option<&str>) -> QueryResponse {
        self.run_state(self.new_state(query), session).await
    }

    /// Drive a prepared state, e.g. one with a pre-seeded budget
    ///
    /// The loop runs on its own task. If that task panics, the response
    /// reports the failure against the last state a stage started with.
    pub async fn run_state(&self, state: AgentState, session: Option<&str>) -> QueryResponse {
        let last_seen = Arc::new(Mutex::new(state.clone()));

        let orchestrator = self.clone();
        let session = session.map(str::to_owned);
        let observed = Arc::clone(&last_seen);
        let run = tokio::spawn(async move {
            orchestrator
                .drive(state, session.as_deref(), |_, state| {
                    if let Ok(mut last) = observed.lock() {
                        *last = state.clone();
                    }
                })
                .await
        });

        match run.await {
            Ok(outcome) => outcome.into_response(),
            Err(join_error) => {
                error!(error = %join_error, "Run task did not complete");
                let state = last_seen
                    .lock()
                    .map(|last| last.clone())
                    .unwrap_or_else(|poisoned| poisoned.into_inner().clone());
                RunOutcome {
                    state,
                    failure: Some(OrchestratorError::Task(join_error.to_string())),
                }
                .into_response()
            }
        }
    }

    /// Run the stage loop, calling `observer` as each stage starts
    pub async fn drive<F>(&self, state: AgentState, session: Option<&str>, mut observer: F) -> RunOutcome
    where
        F: FnMut(Stage, &AgentState) + Send,
    {
        let span = info_span!("query", run_id = %Uuid::new_v4());

        async move {
            info!(query = %state.query, "Starting run");
            let mut state = state;
            let mut stage = Some(Stage::Retrieve);

            while let Some(current) = stage {
                observer(current, &state);
                debug!(
                    stage = current.as_str(),
                    remaining_usd = state.remaining_budget(),
                    "Entering stage"
                );

                let update = match current {
                    Stage::Retrieve => {
                        match stages::retrieve(&state, self.hybrid.as_ref(), &self.config, session).await {
                            Ok(update) => update,
                            Err(e) => {
                                error!(error = %e, "Retrieval failed, aborting run");
                                return RunOutcome {
                                    state,
                                    failure: Some(OrchestratorError::Retrieval(e)),
                                };
                            }
                        }
                    }
                    Stage::Evaluate => stages::evaluate(&state, &self.llm).await,
                    Stage::Research => stages::research(&state, self.web.as_ref(), &self.config).await,
                    Stage::Generate => stages::generate(&state, &self.llm).await,
                };

                if update.is_empty() {
                    debug!(stage = current.as_str(), "Stage made no changes");
                } else {
                    state = state.apply_update(update);
                }
                stage = next_stage(current, &state);
            }

            info!(
                research_iterations = state.research_iterations,
                cost_usd = state.cost_spent_usd,
                exceeded_limit = state.exceeded_limit.as_str(),
                answered = state.final_answer.is_some(),
                "Run complete"
            );

            RunOutcome { state, failure: None }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("llm", &self.llm)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
