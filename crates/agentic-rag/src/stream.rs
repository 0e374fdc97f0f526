//! Streaming event emitter
//!
//! Turns one run into an ordered event stream:
//!
//! ```text
//! thinking(stage)*  chunk*  sources  done
//! ```
//!
//! `thinking` is sent the first time each stage starts. Chunks are sentence
//! fragments of the final answer. If the run aborts or its task panics, an
//! `error` event with step `"unknown"` replaces chunks and sources. `done` is
//! always the last event.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, warn};

use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;
use crate::router::Stage;
use crate::state::{AgentState, ExceededLimit, SourceRef};

/// Abbreviations whose trailing period does not end a sentence
const ABBREVIATIONS: &[&str] = &["Dr", "Mr", "Mrs", "Ms", "Prof", "Sr", "Jr", "vs", "etc"];

/// Step name carried by errors that escaped the pipeline
pub const UNKNOWN_STEP: &str = "unknown";

/// Final counters reported by `done`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub research_iterations: u32,
    pub cost_spent_usd: f64,
    pub cost_ceiling_usd: f64,
    pub exceeded_limit: ExceededLimit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    fn from_state(state: &AgentState) -> Self {
        Self {
            research_iterations: state.research_iterations,
            cost_spent_usd: state.cost_spent_usd,
            cost_ceiling_usd: state.cost_ceiling_usd,
            exceeded_limit: state.exceeded_limit,
            error: state.error.clone(),
        }
    }
}

/// One event of the streaming protocol
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Thinking { step: Stage, message: String },
    Chunk { content: String },
    Sources { internal: Vec<SourceRef>, external: Vec<SourceRef> },
    Error { step: String, message: String },
    Done(RunSummary),
}

impl StreamEvent {
    pub fn thinking(stage: Stage) -> Self {
        Self::Thinking {
            step: stage,
            message: stage.description().to_string(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Thinking { .. } => "thinking",
            Self::Chunk { .. } => "chunk",
            Self::Sources { .. } => "sources",
            Self::Error { .. } => "error",
            Self::Done(_) => "done",
        }
    }

    /// JSON payload of the event
    pub fn data(&self) -> Value {
        match self {
            Self::Thinking { step, message } => json!({ "step": step, "message": message }),
            Self::Chunk { content } => json!({ "content": content }),
            Self::Sources { internal, external } => {
                json!({ "internal": internal, "external": external })
            }
            Self::Error { step, message } => json!({ "step": step, "message": message }),
            Self::Done(summary) => serde_json::to_value(summary).unwrap_or(Value::Null),
        }
    }

    /// Wire frame: `event: <type>\ndata: <json>\n\n`
    pub fn to_sse_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event_type(), self.data())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Split text into sentence-bounded fragments
///
/// `.`, `!` or `?` followed by a space or the end of the text closes a
/// sentence, except a `.` right after one of the known abbreviations. A
/// closed fragment keeps its punctuation and exactly one trailing space;
/// whatever follows the last boundary is returned verbatim. Multi-part
/// abbreviations such as "e.g." are split.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut fragments = Vec::new();
    let mut start = 0;

    for (i, &(offset, c)) in chars.iter().enumerate() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }

        let next = chars.get(i + 1).map(|&(_, n)| n);
        if !matches!(next, None | Some(' ')) {
            continue;
        }

        if c == '.' && follows_abbreviation(&text[start..offset]) {
            continue;
        }

        let end = match next {
            // punctuation plus one space
            Some(_) => offset + c.len_utf8() + 1,
            None => offset + c.len_utf8(),
        };
        fragments.push(text[start..end].to_string());
        start = end;
    }

    if start < text.len() {
        fragments.push(text[start..].to_string());
    }

    fragments
}

fn follows_abbreviation(before: &str) -> bool {
    let word_start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphabetic())
        .last()
        .map(|(i, _)| i);

    match word_start {
        Some(i) => ABBREVIATIONS.contains(&&before[i..]),
        None => false,
    }
}

/// Progress shared between the pipeline task and its supervisor
#[derive(Default)]
struct Progress {
    announced: HashSet<Stage>,
    summary: RunSummary,
}

impl Orchestrator {
    /// Stream a query's progress and answer
    pub fn stream(
        &self,
        query: impl Into<String>,
        session: Option<String>,
    ) -> UnboundedReceiverStream<StreamEvent> {
        self.stream_state(self.new_state(query), session)
    }

    /// [`stream`](Self::stream) for a prepared state
    ///
    /// Must be called inside a Tokio runtime. The stream ends after `done`.
    pub fn stream_state(
        &self,
        state: AgentState,
        session: Option<String>,
    ) -> UnboundedReceiverStream<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = Arc::new(Mutex::new(Progress {
            summary: RunSummary::from_state(&state),
            ..Default::default()
        }));

        let orchestrator = self.clone();
        let pipeline_tx = tx.clone();
        let pipeline_progress = Arc::clone(&progress);
        let pipeline = tokio::spawn(async move {
            orchestrator
                .stream_pipeline(state, session, pipeline_tx, pipeline_progress)
                .await
        });

        tokio::spawn(async move {
            let failure = match pipeline.await {
                Ok(Ok(summary)) => {
                    send(&tx, StreamEvent::Done(summary));
                    return;
                }
                Ok(Err(e)) => e,
                Err(join_error) => {
                    error!(error = %join_error, "Pipeline task did not complete");
                    OrchestratorError::Task(join_error.to_string())
                }
            };

            let summary = progress
                .lock()
                .map(|p| p.summary.clone())
                .unwrap_or_default();

            send(
                &tx,
                StreamEvent::Error {
                    step: UNKNOWN_STEP.to_string(),
                    message: failure.to_string(),
                },
            );
            send(&tx, StreamEvent::Done(summary));
        });

        UnboundedReceiverStream::new(rx)
    }

    async fn stream_pipeline(
        &self,
        state: AgentState,
        session: Option<String>,
        tx: UnboundedSender<StreamEvent>,
        progress: Arc<Mutex<Progress>>,
    ) -> Result<RunSummary, OrchestratorError> {
        let outcome = self
            .drive(state, session.as_deref(), |stage, state| {
                let Ok(mut progress) = progress.lock() else {
                    return;
                };
                progress.summary = RunSummary::from_state(state);
                if progress.announced.insert(stage) {
                    send(&tx, StreamEvent::thinking(stage));
                }
            })
            .await;

        if let Some(failure) = outcome.failure {
            if let Ok(mut progress) = progress.lock() {
                progress.summary = RunSummary::from_state(&outcome.state);
            }
            return Err(failure);
        }

        let state = outcome.state;
        if let Some(answer) = &state.final_answer {
            for content in split_sentences(answer) {
                send(&tx, StreamEvent::Chunk { content });
            }
        }

        let (internal, external) = state.partition_sources();
        send(&tx, StreamEvent::Sources { internal, external });

        Ok(RunSummary::from_state(&state))
    }
}

fn send(tx: &UnboundedSender<StreamEvent>, event: StreamEvent) {
    if tx.send(event).is_err() {
        warn!("Stream receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SourceType;

    #[test]
    fn test_abbreviation_is_not_a_boundary() {
        assert_eq!(
            split_sentences("Dr. Smith arrived. He left."),
            vec!["Dr. Smith arrived. ", "He left."]
        );
    }

    #[test]
    fn test_mixed_punctuation() {
        assert_eq!(
            split_sentences("Really? Yes! Done"),
            vec!["Really? ", "Yes! ", "Done"]
        );
    }

    #[test]
    fn test_boundary_keeps_exactly_one_space() {
        assert_eq!(split_sentences("One.  Two."), vec!["One. ", " Two."]);
    }

    #[test]
    fn test_no_boundary_inside_tokens() {
        assert_eq!(split_sentences("Version 1.2 shipped"), vec!["Version 1.2 shipped"]);
        assert_eq!(split_sentences("Apples vs. oranges."), vec!["Apples vs. oranges."]);
    }

    #[test]
    fn test_multi_part_abbreviation_splits() {
        assert_eq!(
            split_sentences("Use tools, e.g. cargo."),
            vec!["Use tools, e.g. ", "cargo."]
        );
    }

    #[test]
    fn test_empty_text() {
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn test_sse_frames() {
        let frame = StreamEvent::Chunk {
            content: "Hi.".to_string(),
        }
        .to_sse_frame();
        assert_eq!(frame, "event: chunk\ndata: {\"content\":\"Hi.\"}\n\n");

        let thinking = StreamEvent::thinking(Stage::Retrieve);
        assert_eq!(thinking.event_type(), "thinking");
        assert_eq!(thinking.data()["step"], "retrieve");
    }

    #[test]
    fn test_sources_and_done_payloads() {
        let sources = StreamEvent::Sources {
            internal: vec![SourceRef {
                id: Some("doc-1".to_string()),
                title: None,
                url: None,
                source_type: SourceType::Internal,
                snippet: None,
            }],
            external: Vec::new(),
        };
        assert_eq!(sources.data()["internal"][0]["id"], "doc-1");
        assert_eq!(sources.data()["external"], json!([]));

        let done = StreamEvent::Done(RunSummary {
            research_iterations: 2,
            exceeded_limit: ExceededLimit::Timeout,
            ..Default::default()
        });
        assert!(done.is_terminal());
        assert_eq!(done.data()["research_iterations"], 2);
        assert_eq!(done.data()["exceeded_limit"], "timeout");
        assert!(done.data().get("error").is_none());
    }
}
