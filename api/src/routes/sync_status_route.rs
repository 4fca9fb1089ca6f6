use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use sync_worker::{RunOutcome, SchedulerState, SchedulerStatus};

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};
use crate::error_handler::{AppError, AppResult};

/// Scheduler status on the wire.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub state: SchedulerState,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_result: Option<RunOutcome>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub error_count: u64,
}

impl From<SchedulerStatus> for SyncStatusResponse {
    fn from(status: SchedulerStatus) -> Self {
        Self {
            state: status.state,
            last_run_at: status.last_run_at,
            last_run_result: status.last_run_result,
            next_run_at: status.next_run_at,
            run_count: status.run_count,
            error_count: status.error_count,
        }
    }
}

/// `GET /api/sync/status`
pub async fn sync_status_route(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let Some(scheduler) = &state.scheduler else {
        return Err(AppError::Http {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "SCHEDULER_DISABLED",
            message: "sync scheduler is not running in this process".into(),
        });
    };

    let body = SyncStatusResponse::from(scheduler.status());
    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::OK))
}
