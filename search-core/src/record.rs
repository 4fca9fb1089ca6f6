//! Search result projections shared across the search pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Origin system a document was ingested from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentSource {
    #[serde(rename = "qiita_team")]
    QiitaTeam,
    #[serde(rename = "google_drive")]
    GoogleDrive,
    #[serde(rename = "onedrive")]
    OneDrive,
}

impl DocumentSource {
    /// Canonical string form, as stored in the `source` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentSource::QiitaTeam => "qiita_team",
            DocumentSource::GoogleDrive => "google_drive",
            DocumentSource::OneDrive => "onedrive",
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qiita_team" => Ok(DocumentSource::QiitaTeam),
            "google_drive" => Ok(DocumentSource::GoogleDrive),
            "onedrive" => Ok(DocumentSource::OneDrive),
            other => Err(format!("unknown document source: {other}")),
        }
    }
}

/// Per-query projection of a document together with its relevance score.
///
/// Semantic similarity stays within `[0, 1]`; lexical relevance is a sum of
/// two trigram similarities and can slightly exceed 1. Never persisted.
#[derive(Clone, Debug, Serialize)]
pub struct ScoredSearchResult {
    pub id: String,
    pub title: String,
    pub url: String,
    pub author: String,
    pub updated_at: DateTime<Utc>,
    pub source: DocumentSource,
    pub score: f64,
}

/// Score-less projection kept for callers of the legacy keyword search.
#[derive(Clone, Debug, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub url: String,
    pub author: String,
    pub updated_at: DateTime<Utc>,
    pub source: DocumentSource,
}

impl From<ScoredSearchResult> for SearchResult {
    fn from(scored: ScoredSearchResult) -> Self {
        Self {
            id: scored.id,
            title: scored.title,
            url: scored.url,
            author: scored.author,
            updated_at: scored.updated_at,
            source: scored.source,
        }
    }
}
