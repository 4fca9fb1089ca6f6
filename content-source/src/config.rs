//! Content-source client configuration.

/// Configuration shared by all Qiita clients, independent of credentials.
#[derive(Clone, Debug)]
pub struct ContentSourceConfig {
    /// API base, e.g. `https://qiita.com/api/v2`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Concurrent in-flight requests during a batch access check.
    pub access_check_concurrency: usize,
}

impl Default for ContentSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://qiita.com/api/v2".into(),
            timeout_secs: 30,
            access_check_concurrency: 8,
        }
    }
}

impl ContentSourceConfig {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("QIITA_API_BASE").unwrap_or(defaults.base_url),
            timeout_secs: std::env::var("QIITA_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            access_check_concurrency: std::env::var("QIITA_ACCESS_CHECK_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.access_check_concurrency),
        }
    }
}
