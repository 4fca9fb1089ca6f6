//! Qiita Team content-source client.
//!
//! Two concerns, both scoped to a caller-supplied access token:
//! - fetching team articles for ingestion (paginated);
//! - answering "which of these articles can this credential see right now"
//!   for permission filtering, single or batched with bounded concurrency.
//!
//! Access checks fail closed: any non-OK response or transport error counts
//! as "not accessible".

mod access;
mod api_types;
mod client;
mod config;
mod error;

pub use access::QiitaAccessChecker;
pub use api_types::{QiitaArticle, QiitaUser};
pub use client::QiitaClient;
pub use config::ContentSourceConfig;
pub use error::ContentSourceError;
