//! Reciprocal Rank Fusion: score = Σ 1/(k + rank + 1)
//!
//! Combines multiple ranked lists into a single fused ranking without
//! requiring score normalization across different retrieval methods.
//! Ranks are zero-based, so the top item of a list contributes `1/(k+1)`.

use std::collections::HashMap;

/// Default smoothing constant
pub const DEFAULT_RRF_K: u32 = 60;

/// An item at a given position of one ranked list
#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem<T> {
    pub id: String,
    /// Zero-based position in its source list
    pub rank: usize,
    pub payload: T,
}

impl<T> RankedItem<T> {
    pub fn new(id: impl Into<String>, rank: usize, payload: T) -> Self {
        Self {
            id: id.into(),
            rank,
            payload,
        }
    }

    /// Turn an ordered list into ranked items, ranks assigned by position
    pub fn from_ordered<F>(items: Vec<T>, id_of: F) -> Vec<Self>
    where
        F: Fn(&T) -> String,
    {
        items
            .into_iter()
            .enumerate()
            .map(|(rank, payload)| Self::new(id_of(&payload), rank, payload))
            .collect()
    }
}

/// A candidate after fusion
#[derive(Debug, Clone, PartialEq)]
pub struct FusedItem<T> {
    pub id: String,
    /// Fused RRF score (higher = more relevant)
    pub score: f64,
    /// Payload from the first occurrence of this id
    pub payload: T,
}

/// Contribution of a single list position
pub fn rrf_score(k: u32, rank: usize) -> f64 {
    1.0 / (k as f64 + rank as f64 + 1.0)
}

/// Fuse ranked lists using Reciprocal Rank Fusion.
///
/// Contributions for an id appearing in several lists are summed. The result
/// is sorted by descending fused score; equal scores keep the order in which
/// ids were first encountered. At most `limit` items are returned.
pub fn fuse<T, I>(ranked_lists: I, k: u32, limit: usize) -> Vec<FusedItem<T>>
where
    I: IntoIterator<Item = Vec<RankedItem<T>>>,
{
    let mut fused: Vec<FusedItem<T>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for list in ranked_lists {
        for item in list {
            let contribution = rrf_score(k, item.rank);
            match positions.get(&item.id) {
                Some(&idx) => fused[idx].score += contribution,
                None => {
                    positions.insert(item.id.clone(), fused.len());
                    fused.push(FusedItem {
                        id: item.id,
                        score: contribution,
                        payload: item.payload,
                    });
                }
            }
        }
    }

    // sort_by is stable, so ties keep first-encountered order
    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fused.truncate(limit);
    fused
}
