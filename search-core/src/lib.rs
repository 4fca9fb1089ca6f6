//! Hybrid search scoring and permission filtering.
//!
//! This crate holds the two request-path cores of the knowledge backend:
//! - [`SearchService`] merges semantic (vector) and lexical (trigram)
//!   relevance into one ranked, deduplicated result list.
//! - [`PermissionFilter`] prunes a result list down to what the requesting
//!   user may currently see, verified against a live access-check API.
//!
//! Both operate purely over injected capabilities (traits), so they carry no
//! I/O of their own and can be exercised with in-process test doubles.

mod embed;
mod errors;
mod index;
mod permission;
mod record;
mod scorer;

pub use embed::EmbeddingsProvider;
pub use errors::{PermissionError, SearchError};
pub use index::DocumentIndex;
pub use permission::{AccessChecker, CredentialResolver, PermissionFilter};
pub use record::{DocumentSource, ScoredSearchResult, SearchResult};
pub use scorer::{LEXICAL_WEIGHT, SEMANTIC_WEIGHT, SearchService};
