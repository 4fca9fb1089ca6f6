//! Embedding client configuration.

use crate::service::EmbedError;

/// Configuration for the Gemini embedding backend.
#[derive(Clone, Debug)]
pub struct EmbedConfig {
    /// Gemini API key.
    pub api_key: String,
    /// Embedding model name, e.g. `text-embedding-004`.
    pub model: String,
    /// API base, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub endpoint: String,
    /// Expected embedding dimension.
    pub dim: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum attempts per embedding (first try included).
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_base_delay_ms: u64,
    /// Pause after each successful request, for provider rate limits.
    pub rate_limit_delay_ms: u64,
}

impl EmbedConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    /// Returns [`EmbedError::MissingApiKey`] when `GEMINI_API_KEY` is unset.
    pub fn from_env() -> Result<Self, EmbedError> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| EmbedError::MissingApiKey)?;

        Ok(Self {
            api_key,
            model: std::env::var("GEMINI_EMBED_MODEL")
                .unwrap_or_else(|_| "text-embedding-004".into()),
            endpoint: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into()),
            dim: env_parse("EMBEDDING_DIM", 768),
            timeout_secs: env_parse("GEMINI_TIMEOUT_SECS", 30),
            max_retries: env_parse("GEMINI_MAX_RETRIES", 3),
            retry_base_delay_ms: env_parse("GEMINI_RETRY_BASE_DELAY_MS", 1_000),
            rate_limit_delay_ms: env_parse("GEMINI_RATE_LIMIT_DELAY_MS", 4_000),
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
