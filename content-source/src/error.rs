//! Typed error for the content-source crate.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentSourceError {
    /// Invalid API base (empty or missing http/https).
    #[error("invalid Qiita endpoint: {0}")]
    InvalidEndpoint(String),

    /// HTTP/transport errors when calling the API.
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
}
