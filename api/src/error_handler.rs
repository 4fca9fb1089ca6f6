use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use doc_store::StoreError;
use search_core::{PermissionError, SearchError};

use crate::core::http::response_envelope::ApiResponse;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    /// Rich HTTP error mapped from lower layers with specific status & code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingEnv(_) => StatusCode::INTERNAL_SERVER_ERROR, // startup-only
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,

            // custom mapped
            AppError::Http { status, .. } => *status,

            // 5xx
            AppError::Bind(_) | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingEnv(_) => "MISSING_ENV",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Http { code, .. } => code,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let resp: ApiResponse<()> = ApiResponse::error(self.error_code(), self.to_string());
        resp.into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Lexical search failures have no fallback and surface as server errors.
impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        AppError::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "SEARCH_FAILED",
            message: format!("Search failed: {err}"),
        }
    }
}

/// An unknown requester is a server-side error response, never an empty
/// success; deliberate deny-all stays a 200 with no results.
impl From<PermissionError> for AppError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::UserNotFound { .. } => AppError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "USER_NOT_FOUND",
                message: err.to_string(),
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "STORE_ERROR",
            message: format!("Store operation failed: {err}"),
        }
    }
}
