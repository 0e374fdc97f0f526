use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::guardrail;
use crate::search::WebSearch;
use crate::state::{truncate_chars, AgentState, SourceType, StateUpdate, EXTERNAL_SNIPPET_CHARS};

/// Gaps appended to the query when refining it
const REFINEMENT_TERMS: usize = 2;

/// Query built from the original question plus the first evaluation gaps
pub fn refine_query(state: &AgentState) -> String {
    let gaps: Vec<&str> = state
        .evaluation
        .as_ref()
        .map(|e| {
            e.missing_information
                .iter()
                .take(REFINEMENT_TERMS)
                .map(String::as_str)
                .collect()
        })
        .unwrap_or_default();

    if gaps.is_empty() {
        state.query.clone()
    } else {
        format!("{} {}", state.query, gaps.join(" "))
    }
}

/// Fetch external evidence for the current gaps
///
/// Always counts as one research iteration, whether the search ran,
/// failed, or was skipped by a guardrail.
pub async fn research(state: &AgentState, web: &dyn WebSearch, config: &AgentConfig) -> StateUpdate {
    let update = StateUpdate::empty().with_research_iteration();

    let limit = guardrail::check(state);
    if limit.is_set() {
        info!(limit = limit.as_str(), "Skipping web search");
        return update.with_exceeded_limit(limit);
    }

    let query = refine_query(state);
    info!(
        query = %query,
        iteration = state.research_iterations + 1,
        "Researching"
    );

    match web
        .search(&query, config.research_max_results, config.research_depth)
        .await
    {
        Ok(results) => {
            let results: Vec<_> = results
                .into_iter()
                .map(|mut record| {
                    record.source_type = SourceType::External;
                    record.snippet = Some(truncate_chars(&record.content, EXTERNAL_SNIPPET_CHARS));
                    record
                })
                .collect();
            info!(count = results.len(), "Web search complete");
            update.with_external_results(results)
        }
        Err(e) => {
            warn!(error = %e, "Web search failed, continuing without new evidence");
            update
        }
    }
}
