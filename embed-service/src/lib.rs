//! Gemini embedding service.
//!
//! A thin client for the Gemini `embedContent` API with the retry policy the
//! rest of the workspace relies on: transient failures are retried with
//! exponential backoff up to a fixed attempt count, and every successful
//! request is followed by a pacing delay to respect the provider's rate
//! limit. Callers treat an exhausted retry budget as a soft failure and
//! apply their own fallback (empty semantic results, per-article embedding
//! omission).

mod config;
mod service;

pub use config::EmbedConfig;
pub use service::{EmbedError, GeminiService};
