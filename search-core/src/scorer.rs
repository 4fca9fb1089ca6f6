//! Hybrid search scoring: semantic + lexical retrieval, weighted merge.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::embed::EmbeddingsProvider;
use crate::errors::SearchError;
use crate::index::DocumentIndex;
use crate::record::{ScoredSearchResult, SearchResult};

/// Weight applied to the semantic similarity of a document.
pub const SEMANTIC_WEIGHT: f64 = 0.6;
/// Weight applied to the lexical (trigram) relevance of a document.
pub const LEXICAL_WEIGHT: f64 = 0.4;

/// Candidate caps per sub-search.
const SEMANTIC_LIMIT: i64 = 50;
const KEYWORD_LIMIT: i64 = 100;

/// Hybrid search service over an embedding provider and a document index.
///
/// A document ranked by both sub-searches receives the sum of both weighted
/// contributions; agreement between the two independent relevance signals is
/// a stronger indicator than either alone.
pub struct SearchService {
    embedder: Arc<dyn EmbeddingsProvider>,
    index: Arc<dyn DocumentIndex>,
}

impl SearchService {
    pub fn new(embedder: Arc<dyn EmbeddingsProvider>, index: Arc<dyn DocumentIndex>) -> Self {
        Self { embedder, index }
    }

    /// Semantic search by embedding similarity.
    ///
    /// Infallible by design: an embedding or index failure degrades to an
    /// empty list so the caller can fall back to lexical-only ranking.
    pub async fn semantic_search(&self, query: &str) -> Vec<ScoredSearchResult> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let embedding = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(err) => {
                warn!("embedding generation failed, degrading to empty semantic results: {err:#}");
                return Vec::new();
            }
        };

        match self
            .index
            .query_by_vector_distance(&embedding, SEMANTIC_LIMIT)
            .await
        {
            Ok(hits) => hits,
            Err(err) => {
                warn!("vector query failed, degrading to empty semantic results: {err:#}");
                Vec::new()
            }
        }
    }

    /// Lexical search by trigram similarity over title and body.
    ///
    /// # Errors
    /// Propagates index failures; there is no fallback for the lexical path.
    pub async fn keyword_search(
        &self,
        query: &str,
    ) -> Result<Vec<ScoredSearchResult>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        self.index
            .query_by_trigram_similarity(query, KEYWORD_LIMIT)
            .await
            .map_err(SearchError::Index)
    }

    /// Hybrid search: both sub-searches concurrently, merged by id.
    ///
    /// # Errors
    /// Propagates lexical failures only; a degraded semantic half never
    /// aborts the request.
    pub async fn hybrid_search(
        &self,
        query: &str,
    ) -> Result<Vec<ScoredSearchResult>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let (semantic, keyword) = tokio::join!(
            self.semantic_search(query),
            self.keyword_search(query)
        );
        let keyword = keyword?;

        debug!(
            semantic_hits = semantic.len(),
            keyword_hits = keyword.len(),
            "merging hybrid results"
        );
        Ok(merge_weighted(semantic, keyword))
    }

    /// Legacy keyword search without scores.
    ///
    /// # Errors
    /// Same failure behavior as [`Self::keyword_search`].
    pub async fn search_documents(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let scored = self.keyword_search(query).await?;
        Ok(scored.into_iter().map(SearchResult::from).collect())
    }
}

/// Merges the two ranked lists into one, deduplicated by document id.
///
/// Score = semantic × [`SEMANTIC_WEIGHT`] + lexical × [`LEXICAL_WEIGHT`],
/// with a document present in only one list keeping just that term. Sorted
/// by score descending; equal scores fall back to id ascending so the order
/// is deterministic.
fn merge_weighted(
    semantic: Vec<ScoredSearchResult>,
    keyword: Vec<ScoredSearchResult>,
) -> Vec<ScoredSearchResult> {
    let mut merged: HashMap<String, ScoredSearchResult> = HashMap::new();

    for hit in semantic {
        let weighted = hit.score * SEMANTIC_WEIGHT;
        merged
            .entry(hit.id.clone())
            .and_modify(|existing| existing.score += weighted)
            .or_insert_with(|| ScoredSearchResult {
                score: weighted,
                ..hit
            });
    }

    for hit in keyword {
        let weighted = hit.score * LEXICAL_WEIGHT;
        merged
            .entry(hit.id.clone())
            .and_modify(|existing| existing.score += weighted)
            .or_insert_with(|| ScoredSearchResult {
                score: weighted,
                ..hit
            });
    }

    let mut out: Vec<ScoredSearchResult> = merged.into_values().collect();
    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    out
}
