use chrono::{DateTime, Utc};
use serde::Serialize;

use search_core::{DocumentSource, ScoredSearchResult};

/// One search hit on the wire.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub author: String,
    pub updated_at: DateTime<Utc>,
    pub source: DocumentSource,
    pub score: f64,
}

impl From<ScoredSearchResult> for SearchResultItem {
    fn from(result: ScoredSearchResult) -> Self {
        Self {
            id: result.id,
            title: result.title,
            url: result.url,
            author: result.author,
            updated_at: result.updated_at,
            source: result.source,
            score: result.score,
        }
    }
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
}
