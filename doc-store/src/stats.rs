//! Document corpus statistics.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::errors::StoreError;

/// Corpus-wide counters for the stats surface.
///
/// `last_updated` is `None` exactly when the corpus is empty.
#[derive(Clone, Debug)]
pub struct DocumentStats {
    pub total_documents: i64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Computes total document count and the most recent sync timestamp.
///
/// # Errors
/// Returns `StoreError::Database` on query failure.
pub async fn document_stats(pool: &PgPool) -> Result<DocumentStats, StoreError> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS total_documents, MAX(synced_at) AS last_updated FROM documents",
    )
    .fetch_one(pool)
    .await?;

    Ok(DocumentStats {
        total_documents: row.try_get("total_documents")?,
        last_updated: row.try_get("last_updated")?,
    })
}
