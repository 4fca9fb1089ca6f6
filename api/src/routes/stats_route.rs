use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};
use crate::error_handler::AppResult;

/// Corpus stats on the wire. `last_updated` is null exactly when the corpus
/// is empty.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_documents: i64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// `GET /api/stats`
pub async fn stats_route(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let stats = state.store.document_stats().await?;

    let body = StatsResponse {
        total_documents: stats.total_documents,
        last_updated: stats.last_updated,
    };

    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::OK))
}
