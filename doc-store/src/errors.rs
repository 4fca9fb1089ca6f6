//! Unified error type for store operations.

use thiserror::Error;

/// Top-level error for doc-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database driver or query errors.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid or missing configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Credential encryption/decryption failures.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// A `source` column value that no known variant matches.
    #[error("{0}")]
    UnknownSource(String),
}
