//! Bearer-session authentication.
//!
//! Session issuance is external to this service; the middleware only
//! validates the presented token against the sessions table and stashes the
//! resolved user id in request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::core::app_state::AppState;
use crate::error_handler::AppError;

/// Authenticated requester, inserted into request extensions.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Rejects requests without a valid `Authorization: Bearer <token>` header.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;

    let user_id = state
        .store
        .find_session_user(token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    debug!(user_id, "request authenticated");
    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer session-abc"),
        );
        assert_eq!(bearer_token(&headers), Some("session-abc"));
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
