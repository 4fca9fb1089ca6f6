//! Access-checker capability for permission filtering.

use std::collections::HashSet;

use futures::future::BoxFuture;

use search_core::AccessChecker;

use crate::client::QiitaClient;
use crate::config::ContentSourceConfig;

/// [`AccessChecker`] backed by the Qiita API.
///
/// A fresh [`QiitaClient`] is built per call, scoped to the resolved
/// credential: visibility is always judged with the requesting user's own
/// token, never a shared service credential.
pub struct QiitaAccessChecker {
    cfg: ContentSourceConfig,
}

impl QiitaAccessChecker {
    pub fn new(cfg: ContentSourceConfig) -> Self {
        Self { cfg }
    }
}

impl AccessChecker for QiitaAccessChecker {
    fn check_batch_access<'a>(
        &'a self,
        credential: &'a str,
        ids: &'a [String],
    ) -> BoxFuture<'a, anyhow::Result<HashSet<String>>> {
        Box::pin(async move {
            let client = QiitaClient::new(&self.cfg, credential)?;
            Ok(client.check_batch_access(ids).await)
        })
    }
}
