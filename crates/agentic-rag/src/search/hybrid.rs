//! Hybrid search: several retrievers fused with reciprocal rank fusion

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{HybridSearch, MemoryIndex, Ranking, Retriever};
use crate::error::SearchError;
use crate::fusion::{fuse, RankedItem, DEFAULT_RRF_K};
use crate::state::ResultRecord;

/// Each retriever is asked for this many candidates per requested result
const CANDIDATE_MULTIPLIER: usize = 2;

/// [`HybridSearch`] over any number of ranked retrievers
///
/// Retrievers run concurrently. A failing retriever is logged and skipped;
/// the search fails only when every retriever fails.
#[derive(Clone)]
pub struct HybridSearcher {
    retrievers: Vec<Arc<dyn Retriever>>,
    rrf_k: u32,
}

impl HybridSearcher {
    pub fn new() -> Self {
        Self {
            retrievers: Vec::new(),
            rrf_k: DEFAULT_RRF_K,
        }
    }

    /// Term-frequency and title-overlap views of one index
    pub fn over_index(index: &MemoryIndex) -> Self {
        Self::new()
            .with_retriever(Arc::new(index.with_ranking(Ranking::TermFrequency)))
            .with_retriever(Arc::new(index.with_ranking(Ranking::TitleOverlap)))
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retrievers.push(retriever);
        self
    }

    pub fn with_rrf_k(mut self, k: u32) -> Self {
        self.rrf_k = k;
        self
    }

    pub fn retriever_count(&self) -> usize {
        self.retrievers.len()
    }
}

impl Default for HybridSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HybridSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridSearcher")
            .field(
                "retrievers",
                &self.retrievers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("rrf_k", &self.rrf_k)
            .finish()
    }
}

/// Fusion key: document id, else URL, else title
fn fusion_key(record: &ResultRecord) -> String {
    record
        .id
        .clone()
        .or_else(|| record.url.clone())
        .unwrap_or_else(|| record.label().to_string())
}

#[async_trait]
impl HybridSearch for HybridSearcher {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        session: Option<&str>,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        if limit == 0 || self.retrievers.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = limit.saturating_mul(CANDIDATE_MULTIPLIER);
        let outcomes = join_all(
            self.retrievers
                .iter()
                .map(|r| r.retrieve(query, candidates, session)),
        )
        .await;

        let mut lists = Vec::with_capacity(outcomes.len());
        let mut first_error = None;

        for (retriever, outcome) in self.retrievers.iter().zip(outcomes) {
            match outcome {
                Ok(records) => {
                    debug!(retriever = retriever.name(), count = records.len(), "Retriever returned");
                    lists.push(RankedItem::from_ordered(records, fusion_key));
                }
                Err(e) => {
                    warn!(retriever = retriever.name(), error = %e, "Retriever failed, skipping");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if lists.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        Ok(fuse(lists, self.rrf_k, limit)
            .into_iter()
            .map(|item| item.payload.with_score(item.score))
            .collect())
    }
}
