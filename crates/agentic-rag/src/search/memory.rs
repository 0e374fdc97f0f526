//! In-memory document index
//!
//! A small lexical [`Retriever`] over a JSON corpus. Two ranking modes give
//! [`super::HybridSearcher`] independent lists to fuse: term frequency over
//! the whole document and query-term overlap with the title.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::Retriever;
use crate::error::SearchError;
use crate::state::ResultRecord;

/// A document in the internal corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Restricts the document to one session; None is visible to all
    #[serde(default)]
    pub session_id: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            content: content.into(),
            url: None,
            session_id: None,
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

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    fn visible_to(&self, session: Option<&str>) -> bool {
        match (&self.session_id, session) {
            (None, _) => true,
            (Some(owner), Some(session)) => owner == session,
            (Some(_), None) => false,
        }
    }

    fn to_record(&self, score: f64) -> ResultRecord {
        let mut record = ResultRecord::internal(&self.id, &self.content).with_score(score);
        record.title = self.title.clone();
        record.url = self.url.clone();
        record
    }
}

/// How an index orders matching documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    /// Query term occurrences in title and content, length-normalized
    #[default]
    TermFrequency,
    /// Share of query terms present in the title
    TitleOverlap,
}

impl Ranking {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ranking::TermFrequency => "term_frequency",
            Ranking::TitleOverlap => "title_overlap",
        }
    }
}

/// Shared, read-only corpus with a ranking mode
#[derive(Debug, Clone)]
pub struct MemoryIndex {
    documents: Arc<Vec<Document>>,
    ranking: Ranking,
}

impl MemoryIndex {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: Arc::new(documents),
            ranking: Ranking::default(),
        }
    }

    /// Parse a JSON array of documents
    pub fn from_json(json: &str) -> Result<Self, SearchError> {
        let documents: Vec<Document> =
            serde_json::from_str(json).map_err(|e| SearchError::ParseError(e.to_string()))?;
        Ok(Self::new(documents))
    }

    /// Same corpus, different ranking; the documents are shared
    pub fn with_ranking(&self, ranking: Ranking) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
            ranking,
        }
    }

    pub fn ranking(&self) -> Ranking {
        self.ranking
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Ranked matches, best first; non-matching documents are dropped
    pub fn rank(&self, query: &str, limit: usize, session: Option<&str>) -> Vec<ResultRecord> {
        let terms: Vec<String> = unique(tokenize(query));
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &Document)> = self
            .documents
            .iter()
            .filter(|doc| doc.visible_to(session))
            .map(|doc| (self.score(doc, &terms), doc))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        // Stable: equal scores keep corpus order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(limit)
            .map(|(score, doc)| doc.to_record(score))
            .collect()
    }

    fn score(&self, doc: &Document, terms: &[String]) -> f64 {
        match self.ranking {
            Ranking::TermFrequency => {
                let mut tokens = tokenize(doc.title.as_deref().unwrap_or_default());
                tokens.extend(tokenize(&doc.content));
                if tokens.is_empty() {
                    return 0.0;
                }
                let hits = tokens.iter().filter(|t| terms.contains(t)).count();
                hits as f64 / (tokens.len() as f64).sqrt()
            }
            Ranking::TitleOverlap => {
                let title: HashSet<String> = tokenize(doc.title.as_deref().unwrap_or(&doc.id))
                    .into_iter()
                    .collect();
                let hits = terms.iter().filter(|t| title.contains(*t)).count();
                hits as f64 / terms.len() as f64
            }
        }
    }
}

#[async_trait]
impl Retriever for MemoryIndex {
    async fn retrieve(
        &self,
        query: &str,
        limit: usize,
        session: Option<&str>,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        Ok(self.rank(query, limit, session))
    }

    fn name(&self) -> &str {
        self.ranking.as_str()
    }
}

/// Lowercased alphanumeric terms of at least two characters
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

fn unique(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> MemoryIndex {
        MemoryIndex::new(vec![
            Document::new("tokio", "Tokio is an asynchronous runtime for Rust.")
                .with_title("Tokio runtime"),
            Document::new(
                "rrf",
                "Reciprocal rank fusion merges rankings. Fusion needs no score normalization.",
            )
            .with_title("Rank fusion"),
            Document::new("serde", "Serde serializes Rust data structures.")
                .with_title("Serde")
                .with_url("https://serde.rs"),
            Document::new("notes", "Private fusion notes").with_session("alice"),
        ])
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("What is RRF? A rank-fusion method."),
            vec!["what", "is", "rrf", "rank", "fusion", "method"]
        );
        assert!(tokenize("a ? !").is_empty());
    }

    #[test]
    fn test_term_frequency_ranking() {
        let results = corpus().rank("rank fusion", 10, None);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.as_deref(), Some("rrf"));
        assert_eq!(results[0].title.as_deref(), Some("Rank fusion"));
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn test_title_overlap_ranking() {
        let index = corpus().with_ranking(Ranking::TitleOverlap);
        let results = index.rank("serde runtime", 10, None);

        let ids: Vec<_> = results.iter().filter_map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, vec!["tokio", "serde"]);
        assert_eq!(results[0].score, 0.5);
    }

    #[test]
    fn test_session_scoping() {
        let index = corpus();

        assert!(index.rank("private notes", 10, None).is_empty());
        assert!(index.rank("private notes", 10, Some("bob")).is_empty());

        let own = index.rank("private notes", 10, Some("alice"));
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id.as_deref(), Some("notes"));
    }

    #[test]
    fn test_no_match_and_zero_limit() {
        let index = corpus();
        assert!(index.rank("kubernetes", 10, None).is_empty());
        assert!(index.rank("rust", 0, None).is_empty());
        assert!(index.rank("", 10, None).is_empty());
    }

    #[test]
    fn test_limit_applies() {
        let results = corpus().rank("rust", 1, None);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_from_json() {
        let index = MemoryIndex::from_json(
            r#"[
                {"id": "a", "content": "alpha"},
                {"id": "b", "title": "Beta", "content": "beta", "url": "https://b.example"}
            ]"#,
        )
        .unwrap();

        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());
        assert!(matches!(
            MemoryIndex::from_json("{not json"),
            Err(SearchError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_retriever_impl() {
        let index = corpus().with_ranking(Ranking::TitleOverlap);
        assert_eq!(index.name(), "title_overlap");

        let results = index.retrieve("tokio", 5, None).await.unwrap();
        assert_eq!(results[0].id.as_deref(), Some("tokio"));
    }
}
