//! # Centralized Error Handling
//!
//! This module provides a unified error handling system for the application.
//! It centralizes error logging and HTTP response generation, eliminating
//! repetitive error handling patterns throughout the codebase.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Central application error type that encompasses all possible error conditions.
///
/// Variants map onto the error kinds in `spec.md` §7. _Db/queue-store errors are
/// logged automatically as `unavailable`; other errors should be logged at the
/// point of creation if needed._
#[derive(Error, Debug)]
pub enum AppError {
    #[error("database error")]
    Db(#[from] sqlx::Error),

    #[error("queue store error")]
    QueueStore(#[from] crate::services::queue_store::QueueStoreError),

    #[error("UUID parsing error")]
    Uuid(#[from] uuid::Error),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("service unavailable: {0}")]
    Unavailable(&'static str),

    #[error("internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Db(e) = &self {
            error!(?e, "database error occurred");
        }
        if let AppError::QueueStore(e) = &self {
            error!(?e, "queue store error occurred");
        }

        let (status, message): (StatusCode, String) = match self {
            AppError::Db(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "datastore unavailable".into(),
            ),
            AppError::QueueStore(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "queue store unavailable".into(),
            ),
            AppError::Uuid(_) => (StatusCode::BAD_REQUEST, "invalid UUID format".into()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.into()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.into()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.into()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.into()),
            AppError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.into()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.into()),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
            ),
        };

        let body = Json(ErrorBody { message });
        (status, body).into_response()
    }
}

/// Convenience Result type alias that uses AppError as the error type.
pub type AppResult<T> = Result<T, AppError>;
