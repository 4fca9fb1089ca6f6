//! Document index abstraction consumed by the scorer.

use futures::future::BoxFuture;

use crate::record::ScoredSearchResult;

/// Two query shapes over the document store.
///
/// The production implementation runs pgvector / pg_trgm queries; tests
/// substitute scripted result sets.
pub trait DocumentIndex: Send + Sync {
    /// Top documents by ascending vector distance from `embedding`,
    /// restricted to documents that have a stored embedding. The returned
    /// score is already converted to a similarity (`1 - distance`).
    fn query_by_vector_distance<'a>(
        &'a self,
        embedding: &'a [f32],
        limit: i64,
    ) -> BoxFuture<'a, anyhow::Result<Vec<ScoredSearchResult>>>;

    /// Documents whose title or body contains `query` case-insensitively,
    /// scored by summed trigram similarity over title and body, ordered by
    /// relevance then recency.
    fn query_by_trigram_similarity<'a>(
        &'a self,
        query: &'a str,
        limit: i64,
    ) -> BoxFuture<'a, anyhow::Result<Vec<ScoredSearchResult>>>;
}
