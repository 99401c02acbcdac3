//! Error types for the Lybook server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 3,
    NoSuchBook = 5,
    Duplicate = 8,
    BadValue = 18,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Schema validation failure, one message per offending field
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store failure on a write path; reported as a client error
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Re-classify store failures on create/update/archive/restore.
    ///
    /// Reads report store failures as 500; these write paths report them as 400.
    pub fn on_write_path(self) -> Self {
        match self {
            AppError::Database(e) => AppError::WriteFailed(e.to_string()),
            other => other,
        }
    }
}

/// Unreadable request bodies are reported like any other validation failure
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![rejection.body_text()])
    }
}

/// Error response body
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Per-field messages, present on validation failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut errors = None;
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook, msg),
            AppError::Validation(messages) => {
                errors = Some(messages);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorCode::BadValue,
                    "Validation failed".to_string(),
                )
            }
            AppError::DuplicateKey(msg) => (StatusCode::BAD_REQUEST, ErrorCode::Duplicate, msg),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::WriteFailed(msg) => {
                tracing::warn!("Write failed: {}", msg);
                (StatusCode::BAD_REQUEST, ErrorCode::DbFailure, msg)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            errors,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
