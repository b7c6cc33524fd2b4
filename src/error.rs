// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::exam::flow::{Event, Page};
use crate::ledger::LedgerError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., a name that already sat the exam)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Failures of the exam flow that a student or administrator can act on.
#[derive(Debug, Error)]
pub enum ExamError {
    #[error("Paragraph not uploaded by admin.")]
    MissingReferenceText,

    #[error("'{0}' has already attempted the exam")]
    DuplicateAttempt(String),

    #[error("Invalid Credentials")]
    InvalidCredentials,

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("exam session not found")]
    SessionNotFound,

    #[error("exam session is already closed")]
    ExamClosed,

    #[error("cannot apply {event:?} on the {from:?} page")]
    InvalidTransition { from: Page, event: Event },

    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for ExamError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Duplicate(name) => ExamError::DuplicateAttempt(name),
            other => ExamError::Ledger(other),
        }
    }
}

impl From<ExamError> for AppError {
    fn from(err: ExamError) -> Self {
        let message = err.to_string();
        match err {
            ExamError::MissingReferenceText | ExamError::SessionNotFound => {
                AppError::NotFound(message)
            }
            ExamError::DuplicateAttempt(_)
            | ExamError::ExamClosed
            | ExamError::InvalidTransition { .. } => AppError::Conflict(message),
            ExamError::InvalidCredentials => AppError::AuthError(message),
            ExamError::UnknownCategory(_) => AppError::BadRequest(message),
            ExamError::Ledger(inner) => AppError::from(inner),
        }
    }
}

/// Converts ledger failures; malformed import files are the caller's fault.
impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Duplicate(_) => AppError::from(ExamError::from(err)),
            LedgerError::Format { .. } => AppError::BadRequest(err.to_string()),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}
