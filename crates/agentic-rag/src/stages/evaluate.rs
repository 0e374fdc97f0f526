use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::guardrail;
use crate::llm::LlmClient;
use crate::prompts::RagPrompts;
use crate::state::{AgentState, Evaluation, StateUpdate};

const EVALUATION_MAX_TOKENS: u64 = 512;

/// JSON body of the first fenced block, tagged `json` or untagged
static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid regex"));

/// Judge whether the collected evidence answers the query
///
/// Skipped without an LLM call when a guardrail has tripped. A failed call
/// yields a "sufficient" evaluation so the loop moves on to generation.
pub async fn evaluate(state: &AgentState, llm: &LlmClient) -> StateUpdate {
    let limit = guardrail::check(state);
    if limit.is_set() {
        info!(limit = limit.as_str(), "Skipping evaluation");
        return StateUpdate::empty().with_exceeded_limit(limit);
    }

    let prompt = RagPrompts::evaluation(&state.query, &state.internal_results, &state.external_results);
    let system = RagPrompts::evaluator_system();

    match llm
        .complete(&prompt, Some(&system), EVALUATION_MAX_TOKENS, 0.0)
        .await
    {
        Ok(completion) => {
            let evaluation = parse_evaluation(&completion.content);
            info!(
                is_sufficient = evaluation.is_sufficient,
                confidence = evaluation.confidence,
                missing = evaluation.missing_information.len(),
                "Evaluation complete"
            );
            StateUpdate::empty()
                .with_evaluation(evaluation)
                .with_cost(completion.cost())
        }
        Err(e) => {
            warn!(error = %e, "Evaluation call failed, treating evidence as sufficient");
            StateUpdate::empty().with_evaluation(Evaluation::fail_open(e))
        }
    }
}

#[derive(Deserialize)]
struct RawEvaluation {
    is_sufficient: bool,
    confidence: f64,
    missing_information: Vec<String>,
    reasoning: String,
}

/// Parse an evaluator response
///
/// Uses the first fenced code block if present, otherwise the whole trimmed
/// text. Anything unparsable or missing a key becomes
/// [`Evaluation::parse_failure`].
pub fn parse_evaluation(text: &str) -> Evaluation {
    let payload = extract_json(text);

    match serde_json::from_str::<RawEvaluation>(payload) {
        Ok(raw) => Evaluation::new(raw.is_sufficient, raw.confidence)
            .with_missing(raw.missing_information)
            .with_reasoning(raw.reasoning),
        Err(e) => {
            warn!(error = %e, "Could not parse evaluation response");
            Evaluation::parse_failure(text)
        }
    }
}

fn extract_json(text: &str) -> &str {
    let fenced = FENCED_JSON.captures(text).and_then(|caps| caps.get(1));

    match fenced {
        Some(m) => m.as_str().trim(),
        None => text.trim(),
    }
}
