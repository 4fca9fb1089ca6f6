use std::sync::Arc;

use axum::{
    Extension,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::debug;

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};
use crate::error_handler::{AppError, AppResult};
use crate::middleware_layer::auth::AuthUser;
use crate::routes::search::search_response::{SearchResponse, SearchResultItem};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub mode: Option<String>,
}

/// Search mode selector. Hybrid is the default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SearchMode {
    Hybrid,
    Keyword,
    Semantic,
}

impl SearchMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "hybrid" => Some(SearchMode::Hybrid),
            "keyword" => Some(SearchMode::Keyword),
            "semantic" => Some(SearchMode::Semantic),
            _ => None,
        }
    }
}

/// `GET /api/search`
///
/// Runs the selected search, then filters the hits down to what the
/// authenticated user may currently see. A degraded semantic pipeline falls
/// back to lexical-only ranking rather than failing the request; an unknown
/// requester is an error response, never an empty success.
pub async fn search_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<SearchParams>,
) -> AppResult<Response> {
    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(AppError::BadRequest(
            "query parameter \"q\" is required".into(),
        ));
    }

    let mode_raw = params.mode.as_deref().unwrap_or("hybrid");
    let mode = SearchMode::parse(mode_raw).ok_or_else(|| {
        AppError::BadRequest(format!(
            "invalid mode \"{mode_raw}\", must be one of: hybrid, keyword, semantic"
        ))
    })?;

    debug!(user_id = user.user_id, ?mode, query = %query, "search request");

    let scored = match mode {
        SearchMode::Keyword => state.search.keyword_search(&query).await?,
        SearchMode::Semantic => state.search.semantic_search(&query).await,
        SearchMode::Hybrid => state.search.hybrid_search(&query).await?,
    };

    let filtered = state
        .permissions
        .filter_by_permissions(user.user_id, scored)
        .await?;

    let results: Vec<SearchResultItem> = filtered.into_iter().map(SearchResultItem::from).collect();
    debug!(user_id = user.user_id, hits = results.len(), "search response");

    Ok(ApiResponse::success(SearchResponse { results }).into_response_with_status(StatusCode::OK))
}
