use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the stores and services.
///
/// `Storage`, `Constraint` and `DeadlineExceeded` are all storage-class
/// failures; they are kept apart so logs say which one happened.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("record not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("storage call exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),

    #[error("concurrent write conflict: {0}")]
    ConcurrencyConflict(String),
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            AppError::Constraint(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            AppError::DeadlineExceeded(_) => (StatusCode::GATEWAY_TIMEOUT, "STORAGE_TIMEOUT"),
            AppError::ConcurrencyConflict(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONCURRENCY_CONFLICT")
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Constraint(db.message().to_string())
            }
            other => AppError::Storage(other),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status.is_server_error() {
            // backend details stay in the logs
            tracing::error!(error = %self, code, "request failed");
            match self {
                AppError::DeadlineExceeded(_) => "Storage timed out".to_string(),
                AppError::ConcurrencyConflict(_) => "Concurrent update, retry".to_string(),
                _ => "Storage error".to_string(),
            }
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message, code })).into_response()
    }
}
