//! Gemini `embedContent` client.
//!
//! `POST {endpoint}/models/{model}:embedContent` with the API key as a query
//! parameter; the response carries the embedding under
//! `{ "embedding": { "values": [...] } }`.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use search_core::EmbeddingsProvider;

use crate::config::EmbedConfig;

/// Errors produced by [`GeminiService`].
#[derive(Debug, Error)]
pub enum EmbedError {
    /// `GEMINI_API_KEY` is not configured.
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,

    /// Invalid endpoint (empty or missing http/https).
    #[error("invalid Gemini endpoint: {0}")]
    InvalidEndpoint(String),

    /// Embedding input was empty or whitespace-only.
    #[error("embedding input is empty")]
    EmptyInput,

    /// Transport/HTTP client error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from upstream.
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Unexpected/invalid JSON response.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The vector came back with the wrong dimensionality. Not retried.
    #[error("embedding dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    /// Every attempt failed; carries the last error's message.
    #[error("embedding failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Result alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Thin client for the Gemini embedding API.
///
/// Reuses one HTTP client with a configurable timeout. [`GeminiService::embed`]
/// applies retry with exponential backoff and post-request pacing.
pub struct GeminiService {
    client: reqwest::Client,
    cfg: EmbedConfig,
    url_embed: String,
}

impl GeminiService {
    /// Creates a new service from the given config.
    ///
    /// # Errors
    /// - [`EmbedError::MissingApiKey`] if the key is blank
    /// - [`EmbedError::InvalidEndpoint`] if `cfg.endpoint` is invalid
    /// - [`EmbedError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: EmbedConfig) -> Result<Self> {
        if cfg.api_key.trim().is_empty() {
            return Err(EmbedError::MissingApiKey);
        }

        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(EmbedError::InvalidEndpoint(cfg.endpoint));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        let base = endpoint.trim_end_matches('/').to_string();
        let url_embed = format!("{}/models/{}:embedContent", base, cfg.model);

        Ok(Self {
            client,
            cfg,
            url_embed,
        })
    }

    /// Generates an embedding for `text`, retrying transient failures.
    ///
    /// Backoff doubles from `retry_base_delay_ms` per attempt; after a
    /// successful request the task sleeps `rate_limit_delay_ms` before
    /// returning so sequential callers stay under the provider's rate limit.
    ///
    /// # Errors
    /// - [`EmbedError::EmptyInput`] for blank input
    /// - [`EmbedError::DimensionMismatch`] on a wrong-size vector (permanent)
    /// - [`EmbedError::RetriesExhausted`] once the attempt budget is spent
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let mut last: Option<EmbedError> = None;

        for attempt in 0..self.cfg.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.cfg.retry_base_delay_ms, attempt - 1);
                tokio::time::sleep(delay).await;
            }

            match self.request_embedding(text).await {
                Ok(values) => {
                    if values.len() != self.cfg.dim {
                        return Err(EmbedError::DimensionMismatch {
                            got: values.len(),
                            want: self.cfg.dim,
                        });
                    }
                    tokio::time::sleep(Duration::from_millis(self.cfg.rate_limit_delay_ms)).await;
                    return Ok(values);
                }
                Err(err) => {
                    warn!(
                        attempt = attempt + 1,
                        max = self.cfg.max_retries,
                        "Gemini embedding attempt failed: {err}"
                    );
                    last = Some(err);
                }
            }
        }

        Err(EmbedError::RetriesExhausted {
            attempts: self.cfg.max_retries,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbedContentRequest {
            content: Content {
                parts: vec![Part { text }],
            },
        };

        debug!("POST {}", self.url_embed);
        let resp = self
            .client
            .post(&self.url_embed)
            .query(&[("key", self.cfg.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_embed.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(240).collect::<String>();
            return Err(EmbedError::HttpStatus {
                status,
                url,
                snippet,
            });
        }

        let out: EmbedContentResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::Decode(format!("serde error: {e}")))?;

        Ok(out.embedding.values)
    }
}

impl EmbeddingsProvider for GeminiService {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, anyhow::Result<Vec<f32>>> {
        Box::pin(async move { self.embed(text).await.map_err(anyhow::Error::from) })
    }
}

fn backoff_delay(base_ms: u64, retry: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << retry.min(16)))
}

/* ==========================
HTTP payloads
========================== */

/// Request body for `models/{model}:embedContent`.
#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Response body for `models/{model}:embedContent`.
#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}
