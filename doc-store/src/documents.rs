//! Document upserts and the two search query shapes.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, error};

use search_core::{DocumentSource, ScoredSearchResult};

use crate::errors::StoreError;

/// Input for a document upsert.
///
/// `embedding` is optional: an article whose embedding generation failed is
/// still persisted, with a NULL vector, and can be backfilled later.
#[derive(Clone, Debug)]
pub struct DocumentInput {
    pub id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub author: String,
    pub source: DocumentSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub embedding: Option<Vec<f32>>,
}

/// Outcome of a transactional batch upsert.
#[derive(Clone, Debug)]
pub struct BatchUpsertResult {
    pub success: bool,
    pub inserted_count: usize,
    pub failed_count: usize,
    pub error: Option<String>,
}

const UPSERT_SQL: &str = r#"
INSERT INTO documents (id, title, body, url, author, source, created_at, updated_at, embedding)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::vector)
ON CONFLICT (id)
DO UPDATE SET
  title = EXCLUDED.title,
  body = EXCLUDED.body,
  url = EXCLUDED.url,
  author = EXCLUDED.author,
  updated_at = EXCLUDED.updated_at,
  embedding = EXCLUDED.embedding,
  synced_at = CURRENT_TIMESTAMP
"#;

/// pgvector input literal: `[v1,v2,...]`.
fn vector_literal(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}

/// Upserts a single document. Row-level atomic, no explicit transaction.
///
/// # Errors
/// Returns `StoreError::Database` on query failure.
pub async fn upsert_document(pool: &PgPool, doc: &DocumentInput) -> Result<(), StoreError> {
    let embedding = doc.embedding.as_deref().map(vector_literal);

    sqlx::query(UPSERT_SQL)
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.body)
        .bind(&doc.url)
        .bind(&doc.author)
        .bind(doc.source.as_str())
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .bind(embedding)
        .execute(pool)
        .await?;

    Ok(())
}

/// Upserts a whole sync cycle inside one transaction.
///
/// All-or-nothing: if any row fails, the transaction is rolled back and zero
/// documents from the batch are persisted. Partial writes of a cycle are
/// judged more harmful than a delayed one.
///
/// # Errors
/// Returns `StoreError::Database` only when a connection cannot be acquired;
/// per-row and commit failures are reported through the returned
/// [`BatchUpsertResult`].
pub async fn batch_upsert_documents(
    pool: &PgPool,
    docs: &[DocumentInput],
) -> Result<BatchUpsertResult, StoreError> {
    if docs.is_empty() {
        return Ok(BatchUpsertResult {
            success: true,
            inserted_count: 0,
            failed_count: 0,
            error: None,
        });
    }

    let mut tx = pool.begin().await?;

    for doc in docs {
        let embedding = doc.embedding.as_deref().map(vector_literal);
        let res = sqlx::query(UPSERT_SQL)
            .bind(&doc.id)
            .bind(&doc.title)
            .bind(&doc.body)
            .bind(&doc.url)
            .bind(&doc.author)
            .bind(doc.source.as_str())
            .bind(doc.created_at)
            .bind(doc.updated_at)
            .bind(embedding)
            .execute(&mut *tx)
            .await;

        if let Err(err) = res {
            error!(doc_id = %doc.id, "batch upsert failed, rolling back: {err}");
            if let Err(rollback_err) = tx.rollback().await {
                error!("rollback failed: {rollback_err}");
            }
            return Ok(BatchUpsertResult {
                success: false,
                inserted_count: 0,
                failed_count: docs.len(),
                error: Some(err.to_string()),
            });
        }
    }

    if let Err(err) = tx.commit().await {
        error!("batch upsert commit failed: {err}");
        return Ok(BatchUpsertResult {
            success: false,
            inserted_count: 0,
            failed_count: docs.len(),
            error: Some(err.to_string()),
        });
    }

    debug!(count = docs.len(), "batch upsert committed");
    Ok(BatchUpsertResult {
        success: true,
        inserted_count: docs.len(),
        failed_count: 0,
        error: None,
    })
}

/// Top `limit` documents by ascending cosine distance from `embedding`,
/// restricted to rows that have a stored vector. Returned score is the
/// similarity `1 - distance`.
///
/// # Errors
/// Returns `StoreError::Database` on query failure, `UnknownSource` on an
/// unmapped `source` value.
pub async fn query_by_vector_distance(
    pool: &PgPool,
    embedding: &[f32],
    limit: i64,
) -> Result<Vec<ScoredSearchResult>, StoreError> {
    let literal = vector_literal(embedding);

    let rows = sqlx::query(
        r#"
        SELECT id, title, url, author, updated_at, source,
               (1 - (embedding <=> $1::vector))::float8 AS score
        FROM documents
        WHERE embedding IS NOT NULL
        ORDER BY embedding <=> $1::vector
        LIMIT $2
        "#,
    )
    .bind(&literal)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_scored).collect()
}

/// Documents whose title or body contains `query` case-insensitively, scored
/// by summed trigram similarity over title and body, ordered by relevance
/// then recency.
///
/// # Errors
/// Returns `StoreError::Database` on query failure, `UnknownSource` on an
/// unmapped `source` value.
pub async fn query_by_trigram_similarity(
    pool: &PgPool,
    query: &str,
    limit: i64,
) -> Result<Vec<ScoredSearchResult>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, url, author, updated_at, source,
               (similarity(title, $1) + similarity(body, $1))::float8 AS score
        FROM documents
        WHERE title ILIKE '%' || $1 || '%' OR body ILIKE '%' || $1 || '%'
        ORDER BY score DESC, updated_at DESC
        LIMIT $2
        "#,
    )
    .bind(query)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_scored).collect()
}

fn row_to_scored(row: PgRow) -> Result<ScoredSearchResult, StoreError> {
    let source_raw: String = row.try_get("source")?;
    let source = source_raw
        .parse::<DocumentSource>()
        .map_err(StoreError::UnknownSource)?;

    Ok(ScoredSearchResult {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        author: row.try_get("author")?,
        updated_at: row.try_get("updated_at")?,
        source,
        score: row.try_get("score")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_literal_formats_pgvector_input() {
        assert_eq!(vector_literal(&[0.1, 0.2, 0.3]), "[0.1,0.2,0.3]");
        assert_eq!(vector_literal(&[]), "[]");
    }
}
