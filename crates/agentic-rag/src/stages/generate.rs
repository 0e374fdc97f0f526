use tracing::{info, warn};

use crate::llm::LlmClient;
use crate::prompts::RagPrompts;
use crate::state::{AgentState, SourceRef, SourceType, StateUpdate};

const GENERATION_MAX_TOKENS: u64 = 2048;
const GENERATION_TEMPERATURE: f64 = 0.3;

/// Citations for every collected result, internal first
pub fn build_sources(state: &AgentState) -> Vec<SourceRef> {
    state
        .internal_results
        .iter()
        .map(|r| SourceRef::from_result(r, SourceType::Internal))
        .chain(
            state
                .external_results
                .iter()
                .map(|r| SourceRef::from_result(r, SourceType::External)),
        )
        .collect()
}

/// Write the final answer
///
/// Sources are attached whether or not the call succeeds. A failed call is
/// reported through `error` with no answer.
pub async fn generate(state: &AgentState, llm: &LlmClient) -> StateUpdate {
    let sources = build_sources(state);
    let prompt = RagPrompts::generation(&state.query, &state.internal_results, &state.external_results);
    let system = RagPrompts::generator_system();

    let update = StateUpdate::empty().with_sources(sources);

    match llm
        .complete(&prompt, Some(&system), GENERATION_MAX_TOKENS, GENERATION_TEMPERATURE)
        .await
    {
        Ok(completion) => {
            info!(
                provider = %completion.provider,
                chars = completion.content.len(),
                "Answer generated"
            );
            let cost = completion.cost();
            update.with_final_answer(completion.content).with_cost(cost)
        }
        Err(e) => {
            warn!(error = %e, "Generation failed");
            update.with_error(e.to_string())
        }
    }
}
