//! Live permission filtering of search results.
//!
//! The content source's own access control (team membership, article
//! visibility) is the ground truth and can change independently of our copy
//! of the data, so every request is checked against a freshly resolved
//! per-user credential rather than a cached permission table.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;

use crate::errors::PermissionError;
use crate::record::ScoredSearchResult;

/// Resolves and decrypts a user's stored external-service credential.
///
/// Returns `Ok(None)` when the user or credential does not exist.
pub trait CredentialResolver: Send + Sync {
    fn resolve<'a>(&'a self, user_id: i64) -> BoxFuture<'a, anyhow::Result<Option<String>>>;
}

/// Batched access check against the content source, scoped to a credential.
///
/// Returns the subset of `ids` the credential can currently access.
pub trait AccessChecker: Send + Sync {
    fn check_batch_access<'a>(
        &'a self,
        credential: &'a str,
        ids: &'a [String],
    ) -> BoxFuture<'a, anyhow::Result<HashSet<String>>>;
}

/// Post-search authorization step.
pub struct PermissionFilter {
    resolver: Arc<dyn CredentialResolver>,
    checker: Arc<dyn AccessChecker>,
}

impl PermissionFilter {
    pub fn new(resolver: Arc<dyn CredentialResolver>, checker: Arc<dyn AccessChecker>) -> Self {
        Self { resolver, checker }
    }

    /// Filters `results` down to the documents `user_id` may currently view,
    /// preserving the original order and all fields.
    ///
    /// Ambiguity about whether a document is visible resolves to "hide it":
    /// any access-check failure yields an empty list. Ambiguity about
    /// whether the requester is a valid user resolves to rejecting the
    /// request instead.
    ///
    /// # Errors
    /// [`PermissionError::UserNotFound`] when no credential exists for
    /// `user_id`; this must surface as an error response, never as an empty
    /// success.
    pub async fn filter_by_permissions(
        &self,
        user_id: i64,
        results: Vec<ScoredSearchResult>,
    ) -> Result<Vec<ScoredSearchResult>, PermissionError> {
        let credential = match self.resolver.resolve(user_id).await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(PermissionError::UserNotFound { user_id }),
            Err(err) => {
                warn!(user_id, "credential resolution failed, denying all results: {err:#}");
                return Ok(Vec::new());
            }
        };

        if results.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = results.iter().map(|r| r.id.clone()).collect();
        let accessible = match self.checker.check_batch_access(&credential, &ids).await {
            Ok(set) => set,
            Err(err) => {
                warn!(user_id, "batch access check failed, denying all results: {err:#}");
                return Ok(Vec::new());
            }
        };

        Ok(results
            .into_iter()
            .filter(|r| accessible.contains(&r.id))
            .collect())
    }
}
