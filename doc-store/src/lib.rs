//! PostgreSQL document store: relational rows with a pgvector column and
//! trigram-indexed text columns.
//!
//! This crate provides:
//! - Single and batch-transactional document upserts
//! - The two search query shapes (vector distance order, trigram similarity
//!   order) behind [`search_core::DocumentIndex`]
//! - Credential resolution ([`search_core::CredentialResolver`]) with
//!   AES-256-GCM token decryption
//! - Session lookup and corpus stats
//!
//! The reference schema lives in `schema.sql`; migrations are managed
//! outside this service.

mod config;
pub mod crypto;
mod documents;
mod errors;
mod sessions;
mod stats;
mod users;

pub use config::StoreConfig;
pub use documents::{BatchUpsertResult, DocumentInput};
pub use errors::StoreError;
pub use stats::DocumentStats;

use futures::future::BoxFuture;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use search_core::{CredentialResolver, DocumentIndex, ScoredSearchResult};

/// Facade over the connection pool; the single entry point recommended for
/// application code.
pub struct DocStore {
    pool: PgPool,
    cfg: StoreConfig,
}

impl DocStore {
    /// Validates the config and connects the pool.
    ///
    /// # Errors
    /// Returns `StoreError::Config` on invalid configuration and
    /// `StoreError::Database` when the pool cannot connect.
    pub async fn connect(cfg: StoreConfig) -> Result<Self, StoreError> {
        cfg.validate()?;
        debug!(max_connections = cfg.max_connections, "connecting document store");

        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(&cfg.database_url)
            .await?;

        Ok(Self { pool, cfg })
    }

    /// Wraps an already-connected pool (used by integration tests).
    pub fn from_pool(pool: PgPool, cfg: StoreConfig) -> Self {
        Self { pool, cfg }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Upserts a single document. See [`documents::upsert_document`].
    ///
    /// # Errors
    /// Returns `StoreError::Database` on query failure.
    pub async fn upsert_document(&self, doc: &DocumentInput) -> Result<(), StoreError> {
        documents::upsert_document(&self.pool, doc).await
    }

    /// Upserts a whole batch in one transaction, all-or-nothing.
    ///
    /// # Errors
    /// Returns `StoreError::Database` only when a connection cannot be
    /// acquired; row/commit failures come back in the result.
    pub async fn batch_upsert_documents(
        &self,
        docs: &[DocumentInput],
    ) -> Result<BatchUpsertResult, StoreError> {
        documents::batch_upsert_documents(&self.pool, docs).await
    }

    /// Top documents by vector similarity. See
    /// [`documents::query_by_vector_distance`].
    ///
    /// # Errors
    /// Returns `StoreError::Database` or `StoreError::UnknownSource`.
    pub async fn query_by_vector_distance(
        &self,
        embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<ScoredSearchResult>, StoreError> {
        documents::query_by_vector_distance(&self.pool, embedding, limit).await
    }

    /// Documents by trigram relevance. See
    /// [`documents::query_by_trigram_similarity`].
    ///
    /// # Errors
    /// Returns `StoreError::Database` or `StoreError::UnknownSource`.
    pub async fn query_by_trigram_similarity(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<ScoredSearchResult>, StoreError> {
        documents::query_by_trigram_similarity(&self.pool, query, limit).await
    }

    /// Resolves and decrypts a user's external-service token.
    ///
    /// Returns `Ok(None)` when the user does not exist.
    ///
    /// # Errors
    /// Returns `StoreError::Database` on lookup failure, `StoreError::Crypto`
    /// when the stored value cannot be decrypted.
    pub async fn decrypted_credential(&self, user_id: i64) -> Result<Option<String>, StoreError> {
        match users::find_encrypted_token(&self.pool, user_id).await? {
            Some(encrypted) => Ok(Some(crypto::decrypt(&encrypted, &self.cfg.encryption_key)?)),
            None => Ok(None),
        }
    }

    /// Resolves a session token to a user id, `None` when unknown.
    ///
    /// # Errors
    /// Returns `StoreError::Database` on query failure.
    pub async fn find_session_user(&self, token: &str) -> Result<Option<i64>, StoreError> {
        sessions::find_session_user(&self.pool, token).await
    }

    /// Corpus statistics for the stats surface.
    ///
    /// # Errors
    /// Returns `StoreError::Database` on query failure.
    pub async fn document_stats(&self) -> Result<DocumentStats, StoreError> {
        stats::document_stats(&self.pool).await
    }
}

impl DocumentIndex for DocStore {
    fn query_by_vector_distance<'a>(
        &'a self,
        embedding: &'a [f32],
        limit: i64,
    ) -> BoxFuture<'a, anyhow::Result<Vec<ScoredSearchResult>>> {
        Box::pin(async move {
            documents::query_by_vector_distance(&self.pool, embedding, limit)
                .await
                .map_err(anyhow::Error::from)
        })
    }

    fn query_by_trigram_similarity<'a>(
        &'a self,
        query: &'a str,
        limit: i64,
    ) -> BoxFuture<'a, anyhow::Result<Vec<ScoredSearchResult>>> {
        Box::pin(async move {
            documents::query_by_trigram_similarity(&self.pool, query, limit)
                .await
                .map_err(anyhow::Error::from)
        })
    }
}

impl CredentialResolver for DocStore {
    fn resolve<'a>(&'a self, user_id: i64) -> BoxFuture<'a, anyhow::Result<Option<String>>> {
        Box::pin(async move {
            self.decrypted_credential(user_id)
                .await
                .map_err(anyhow::Error::from)
        })
    }
}
