use tracing::info;

use crate::config::AgentConfig;
use crate::error::SearchError;
use crate::search::HybridSearch;
use crate::state::{AgentState, SourceType, StateUpdate};

/// Query internal documents once
///
/// An empty result list is a normal outcome. A search error is returned to
/// the driver, which aborts the run.
pub async fn retrieve(
    state: &AgentState,
    hybrid: &dyn HybridSearch,
    config: &AgentConfig,
    session: Option<&str>,
) -> Result<StateUpdate, SearchError> {
    let mut results = hybrid
        .search(&state.query, config.retrieval_limit, session)
        .await?;

    for record in &mut results {
        record.source_type = SourceType::Internal;
    }

    info!(count = results.len(), "Retrieved internal results");
    Ok(StateUpdate::empty().with_internal_results(results))
}
