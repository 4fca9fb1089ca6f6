use std::sync::Arc;

use doc_store::DocStore;
use search_core::{PermissionFilter, SearchService};
use sync_worker::SyncScheduler;

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Hybrid search scorer.
    pub search: SearchService,
    /// Per-request authorization against the content source.
    pub permissions: PermissionFilter,
    /// Document store, also used for session and stats lookups.
    pub store: Arc<DocStore>,
    /// Sync scheduler, when this process hosts one.
    pub scheduler: Option<Arc<SyncScheduler>>,
}
