//! HTTP surface of the knowledge backend.
//!
//! Routes:
//! - `GET /api/search?q=…&mode=hybrid|keyword|semantic` (authenticated)
//! - `GET /api/stats`
//! - `GET /api/sync/status`
//!
//! Responses use a single envelope (`{ success, data?, error? }`); search
//! requests never fail just because the semantic half-pipeline is degraded.

use std::{env, sync::Arc};

mod core;
mod error_handler;
mod middleware_layer;
mod routes;

pub use crate::core::app_state::AppState;
pub use error_handler::{AppError, AppResult};

use axum::{Router, middleware, routing::get};
use tokio::signal;
use tracing::info;

use crate::middleware_layer::auth::require_auth;
use crate::routes::{
    search::search_route, stats_route::stats_route, sync_status_route::sync_status_route,
};

/// Builds the application router. Exposed separately from [`start`] so tests
/// can drive it without binding a socket.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/search", get(search_route))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/api/stats", get(stats_route))
        .route("/api/sync/status", get(sync_status_route))
        .merge(protected)
        .with_state(state)
}

/// Binds `API_ADDRESS` and serves until Ctrl+C.
///
/// # Errors
/// Returns `AppError::MissingEnv`, `Bind`, or `Server`.
pub async fn start(state: Arc<AppState>) -> Result<(), AppError> {
    let host_url = env::var("API_ADDRESS").map_err(|_| AppError::MissingEnv("API_ADDRESS"))?;

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!("API listening on {host_url}");

    // Serve with graceful shutdown on Ctrl+C.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
}
