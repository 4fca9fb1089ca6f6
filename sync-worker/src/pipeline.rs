//! One sync cycle: fetch articles, embed each independently, persist the
//! whole batch in a single transaction.
//!
//! The failure policies are deliberately asymmetric. Embedding failures are
//! tolerated per article: the article is persisted without a vector and the
//! error lands in the cycle's error list. Storage failures are
//! all-or-nothing: a failed batch rolls back completely and the cycle is
//! marked failed. Embeddings run sequentially to respect the provider's
//! rate limit.

use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use tracing::{info, warn};

use content_source::{QiitaArticle, QiitaClient};
use doc_store::{BatchUpsertResult, DocStore, DocumentInput};
use search_core::{DocumentSource, EmbeddingsProvider};

use crate::job::SyncJobResult;

/// Source of the articles for a cycle.
pub trait ArticleFetcher: Send + Sync {
    fn fetch_all<'a>(&'a self) -> BoxFuture<'a, anyhow::Result<Vec<QiitaArticle>>>;
}

/// Destination for the cycle's batch.
pub trait DocumentSink: Send + Sync {
    fn batch_upsert<'a>(
        &'a self,
        docs: &'a [DocumentInput],
    ) -> BoxFuture<'a, anyhow::Result<BatchUpsertResult>>;
}

impl ArticleFetcher for QiitaClient {
    fn fetch_all<'a>(&'a self) -> BoxFuture<'a, anyhow::Result<Vec<QiitaArticle>>> {
        Box::pin(async move { self.fetch_all_articles().await.map_err(anyhow::Error::from) })
    }
}

impl DocumentSink for DocStore {
    fn batch_upsert<'a>(
        &'a self,
        docs: &'a [DocumentInput],
    ) -> BoxFuture<'a, anyhow::Result<BatchUpsertResult>> {
        Box::pin(async move {
            self.batch_upsert_documents(docs)
                .await
                .map_err(anyhow::Error::from)
        })
    }
}

/// Embedding-assisted batch sync for the Qiita Team source.
pub struct SyncPipeline {
    fetcher: Arc<dyn ArticleFetcher>,
    embedder: Arc<dyn EmbeddingsProvider>,
    sink: Arc<dyn DocumentSink>,
}

impl SyncPipeline {
    pub fn new(
        fetcher: Arc<dyn ArticleFetcher>,
        embedder: Arc<dyn EmbeddingsProvider>,
        sink: Arc<dyn DocumentSink>,
    ) -> Self {
        Self {
            fetcher,
            embedder,
            sink,
        }
    }

    /// Runs one full cycle and reports it as a [`SyncJobResult`]; never
    /// returns an error.
    pub async fn run_sync_cycle(&self) -> SyncJobResult {
        let started_at = Utc::now();
        let mut errors: Vec<String> = Vec::new();

        let articles = match self.fetcher.fetch_all().await {
            Ok(articles) => articles,
            Err(err) => {
                warn!("article fetch failed, aborting cycle: {err:#}");
                return SyncJobResult::failure(started_at, format!("article fetch failed: {err}"));
            }
        };
        info!(count = articles.len(), "fetched articles for sync cycle");

        let mut docs = Vec::with_capacity(articles.len());
        for article in articles {
            let text = format!("{}\n{}", article.title, article.body);
            // Sequential on purpose: the embedding provider is rate limited.
            let embedding = match self.embedder.embed(&text).await {
                Ok(vector) => Some(vector),
                Err(err) => {
                    warn!(article_id = %article.id, "embedding failed, persisting without vector: {err:#}");
                    errors.push(format!("embedding failed for {}: {err}", article.id));
                    None
                }
            };

            docs.push(DocumentInput {
                id: article.id.clone(),
                title: article.title.clone(),
                body: article.body.clone(),
                url: article.url.clone(),
                author: article.author().to_string(),
                source: DocumentSource::QiitaTeam,
                created_at: article.created_at,
                updated_at: article.updated_at,
                embedding,
            });
        }

        let upsert = match self.sink.batch_upsert(&docs).await {
            Ok(result) => result,
            Err(err) => {
                warn!("batch persistence failed: {err:#}");
                BatchUpsertResult {
                    success: false,
                    inserted_count: 0,
                    failed_count: docs.len(),
                    error: Some(err.to_string()),
                }
            }
        };
        if let Some(err) = &upsert.error {
            errors.push(format!("batch upsert failed: {err}"));
        }

        let completed_at = Utc::now();
        let result = SyncJobResult {
            started_at,
            completed_at,
            success: upsert.success,
            synced_count: upsert.inserted_count,
            failed_count: upsert.failed_count,
            errors,
            duration_ms: (completed_at - started_at).num_milliseconds(),
        };

        info!(
            success = result.success,
            synced = result.synced_count,
            failed = result.failed_count,
            duration_ms = result.duration_ms,
            "sync cycle finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use std::sync::Mutex;

    use content_source::QiitaUser;

    fn article(id: &str) -> QiitaArticle {
        let at: DateTime<Utc> = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        QiitaArticle {
            id: id.to_string(),
            title: format!("title {id}"),
            body: format!("body {id}"),
            url: format!("https://example.qiita.com/items/{id}"),
            created_at: at,
            updated_at: at,
            user: QiitaUser {
                id: "user1".to_string(),
                name: "User One".to_string(),
            },
        }
    }

    struct FakeFetcher {
        articles: Option<Vec<QiitaArticle>>,
    }

    impl ArticleFetcher for FakeFetcher {
        fn fetch_all<'a>(&'a self) -> BoxFuture<'a, anyhow::Result<Vec<QiitaArticle>>> {
            Box::pin(async move {
                match &self.articles {
                    Some(articles) => Ok(articles.clone()),
                    None => anyhow::bail!("content source unreachable"),
                }
            })
        }
    }

    /// Embeds everything except article texts containing a poison marker.
    struct SelectiveEmbedder {
        poison: &'static str,
    }

    impl EmbeddingsProvider for SelectiveEmbedder {
        fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, anyhow::Result<Vec<f32>>> {
            Box::pin(async move {
                if !self.poison.is_empty() && text.contains(self.poison) {
                    anyhow::bail!("rate limited");
                }
                Ok(vec![0.5; 768])
            })
        }
    }

    struct RecordingSink {
        received: Mutex<Vec<DocumentInput>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new(fail: bool) -> Self {
            Self {
                received: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl DocumentSink for RecordingSink {
        fn batch_upsert<'a>(
            &'a self,
            docs: &'a [DocumentInput],
        ) -> BoxFuture<'a, anyhow::Result<BatchUpsertResult>> {
            Box::pin(async move {
                *self.received.lock().unwrap() = docs.to_vec();
                if self.fail {
                    return Ok(BatchUpsertResult {
                        success: false,
                        inserted_count: 0,
                        failed_count: docs.len(),
                        error: Some("null value in column \"title\"".to_string()),
                    });
                }
                Ok(BatchUpsertResult {
                    success: true,
                    inserted_count: docs.len(),
                    failed_count: 0,
                    error: None,
                })
            })
        }
    }

    fn pipeline(
        articles: Option<Vec<QiitaArticle>>,
        poison: &'static str,
        sink: Arc<RecordingSink>,
    ) -> SyncPipeline {
        SyncPipeline::new(
            Arc::new(FakeFetcher { articles }),
            Arc::new(SelectiveEmbedder { poison }),
            sink,
        )
    }

    #[tokio::test]
    async fn successful_cycle_persists_every_article_with_embeddings() {
        let sink = Arc::new(RecordingSink::new(false));
        let p = pipeline(
            Some(vec![article("a1"), article("a2"), article("a3")]),
            "",
            sink.clone(),
        );

        let result = p.run_sync_cycle().await;
        assert!(result.success);
        assert_eq!(result.synced_count, 3);
        assert_eq!(result.failed_count, 0);
        assert!(result.errors.is_empty());

        let received = sink.received.lock().unwrap();
        assert_eq!(received.len(), 3);
        assert!(received.iter().all(|d| d.embedding.is_some()));
        assert!(received.iter().all(|d| d.source == DocumentSource::QiitaTeam));
        assert_eq!(received[0].author, "User One");
    }

    #[tokio::test]
    async fn embedding_failure_does_not_block_the_cycle() {
        let sink = Arc::new(RecordingSink::new(false));
        // Article a2's text contains the poison marker, so only it fails.
        let p = pipeline(
            Some(vec![article("a1"), article("a2"), article("a3")]),
            "a2",
            sink.clone(),
        );

        let result = p.run_sync_cycle().await;
        assert!(result.success, "the cycle still commits");
        assert_eq!(result.synced_count, 3);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("a2"));

        let received = sink.received.lock().unwrap();
        assert_eq!(received.len(), 3);
        let a2 = received.iter().find(|d| d.id == "a2").unwrap();
        assert!(a2.embedding.is_none(), "failed article is persisted without a vector");
        assert!(received.iter().filter(|d| d.embedding.is_some()).count() == 2);
    }

    #[tokio::test]
    async fn storage_failure_fails_the_whole_cycle() {
        let sink = Arc::new(RecordingSink::new(true));
        let p = pipeline(Some(vec![article("a1"), article("a2")]), "", sink);

        let result = p.run_sync_cycle().await;
        assert!(!result.success);
        assert_eq!(result.synced_count, 0);
        assert_eq!(result.failed_count, 2);
        assert!(result.errors.iter().any(|e| e.contains("batch upsert failed")));
    }

    #[tokio::test]
    async fn fetch_failure_aborts_the_cycle() {
        let sink = Arc::new(RecordingSink::new(false));
        let p = pipeline(None, "", sink.clone());

        let result = p.run_sync_cycle().await;
        assert!(!result.success);
        assert_eq!(result.synced_count, 0);
        assert!(result.errors[0].contains("article fetch failed"));
        assert!(sink.received.lock().unwrap().is_empty());
    }
}
