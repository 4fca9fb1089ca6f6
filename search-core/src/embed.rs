//! Embedding provider abstraction.

use futures::future::BoxFuture;

/// Provider interface for embedding generation.
///
/// Implement this trait to plug in an embedding backend (Gemini in
/// production, fixed vectors in tests).
pub trait EmbeddingsProvider: Send + Sync {
    /// Produces a fixed-dimension embedding vector for the given text.
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, anyhow::Result<Vec<f32>>>;
}
