//! Error types for the search and permission cores.

use thiserror::Error;

/// Errors surfaced by the lexical search path.
///
/// The semantic path never returns an error: it degrades to an empty result
/// list instead. Keeping the two shapes apart makes that asymmetry visible
/// in the signatures rather than in a comment.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The document index query failed. The lexical path has no cheaper
    /// alternative to fall back to, so this propagates to the caller.
    #[error("document index error: {0}")]
    Index(#[source] anyhow::Error),
}

/// Errors surfaced by permission filtering.
///
/// Everything except a missing user resolves to an empty (deny-all) result
/// list, so this enum carries only the one fatal condition.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// The requesting user does not exist or has no stored credential.
    /// Always re-raised: an unknown requester must produce an error
    /// response, never an empty success.
    #[error("user {user_id} not found or credential unavailable")]
    UserNotFound { user_id: i64 },
}
