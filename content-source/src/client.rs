//! Credential-scoped Qiita API client.

use std::collections::HashSet;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::api_types::QiitaArticle;
use crate::config::ContentSourceConfig;
use crate::error::ContentSourceError;

/// Page size used when walking the whole team feed.
const FETCH_PAGE_SIZE: u32 = 100;
/// Qiita caps `page` at 100.
const MAX_PAGES: u32 = 100;

/// Result alias for content-source operations.
pub type Result<T> = std::result::Result<T, ContentSourceError>;

/// Qiita API client bound to one access token.
pub struct QiitaClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    access_check_concurrency: usize,
}

impl QiitaClient {
    /// Creates a client for the given credential.
    ///
    /// # Errors
    /// - [`ContentSourceError::InvalidEndpoint`] if the base URL is invalid
    /// - [`ContentSourceError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: &ContentSourceConfig, token: impl Into<String>) -> Result<Self> {
        let base = cfg.base_url.trim();
        if base.is_empty() || !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ContentSourceError::InvalidEndpoint(cfg.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base.trim_end_matches('/').to_string(),
            token: token.into(),
            access_check_concurrency: cfg.access_check_concurrency.max(1),
        })
    }

    /// Fetches one page of team articles.
    ///
    /// # Errors
    /// Returns transport/status/decode errors from the API call.
    pub async fn fetch_articles(&self, page: u32, per_page: u32) -> Result<Vec<QiitaArticle>> {
        let url = format!(
            "{}/items?page={}&per_page={}",
            self.base_url, page, per_page
        );

        debug!("GET {url}");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(240).collect::<String>();
            return Err(ContentSourceError::HttpStatus {
                status,
                url,
                snippet,
            });
        }

        resp.json::<Vec<QiitaArticle>>()
            .await
            .map_err(|e| ContentSourceError::Decode(format!("serde error: {e}")))
    }

    /// Walks the paginated feed until a short page and returns everything.
    ///
    /// # Errors
    /// Propagates the first page fetch failure.
    pub async fn fetch_all_articles(&self) -> Result<Vec<QiitaArticle>> {
        let mut all = Vec::new();

        for page in 1..=MAX_PAGES {
            let batch = self.fetch_articles(page, FETCH_PAGE_SIZE).await?;
            let short_page = (batch.len() as u32) < FETCH_PAGE_SIZE;
            all.extend(batch);
            if short_page {
                break;
            }
        }

        debug!(count = all.len(), "fetched article feed");
        Ok(all)
    }

    /// Checks whether this credential can currently access one article.
    ///
    /// `GET /items/:id`: 200 means accessible, 404 means not. Any other
    /// status or a transport error also counts as not accessible — ambiguity
    /// about visibility resolves to "hide it".
    pub async fn check_article_access(&self, article_id: &str) -> bool {
        let url = format!("{}/items/{}", self.base_url, article_id);

        let resp = match self.client.get(&url).bearer_auth(&self.token).send().await {
            Ok(resp) => resp,
            Err(err) => {
                warn!(article_id, "access check transport error, denying: {err}");
                return false;
            }
        };

        match resp.status() {
            status if status.is_success() => true,
            StatusCode::NOT_FOUND => false,
            status => {
                warn!(article_id, %status, "access check returned unexpected status, denying");
                false
            }
        }
    }

    /// Checks a batch of article ids with bounded concurrency and returns
    /// the accessible subset.
    pub async fn check_batch_access(&self, article_ids: &[String]) -> HashSet<String> {
        if article_ids.is_empty() {
            return HashSet::new();
        }

        let checks = stream::iter(article_ids.iter().cloned())
            .map(|id| async move {
                let accessible = self.check_article_access(&id).await;
                (id, accessible)
            })
            .buffer_unordered(self.access_check_concurrency)
            .collect::<Vec<(String, bool)>>()
            .await;

        checks
            .into_iter()
            .filter_map(|(id, accessible)| accessible.then_some(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        let cfg = ContentSourceConfig {
            base_url: "qiita.com/api/v2".into(),
            ..ContentSourceConfig::default()
        };
        assert!(matches!(
            QiitaClient::new(&cfg, "token"),
            Err(ContentSourceError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn batch_access_with_no_ids_makes_no_requests() {
        // Unroutable base: any real request would error loudly.
        let cfg = ContentSourceConfig {
            base_url: "http://127.0.0.1:1".into(),
            timeout_secs: 1,
            ..ContentSourceConfig::default()
        };
        let client = QiitaClient::new(&cfg, "token").unwrap();

        let accessible = client.check_batch_access(&[]).await;
        assert!(accessible.is_empty());
    }
}
