use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// AppError
///
/// The single error type returned by handlers, the security core and the repository layer.
/// Handlers never build status codes themselves: every failure flows back as an `AppError`
/// and is mapped to an HTTP response exactly once, in the `IntoResponse` impl below.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad signature, malformed structure or expired token. Deliberately carries no detail.
    #[error("invalid or expired token")]
    InvalidToken,
    /// No principal on a route that requires one.
    #[error("authentication required")]
    Unauthorized,
    /// Unknown email or wrong password. Both cases share one message.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// Principal lacks the required role or does not own the resource.
    #[error("{0}")]
    Forbidden(&'static str),
    /// Login throttle is active for the submitted identifier.
    #[error("too many failed login attempts, please try again later")]
    TooManyAttempts,
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A moderation action that the current listing status does not allow.
    #[error("cannot {action} a listing in status {from}")]
    InvalidTransition {
        action: &'static str,
        from: &'static str,
    },
    #[error("email already in use")]
    EmailTaken,
    /// Field-level validation failures, keyed by field name.
    #[error("validation failed")]
    Validation(BTreeMap<String, String>),
    #[error("{0}")]
    BadRequest(String),
    /// Anything unexpected. The message is logged, never sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }

    /// Status code and machine-readable code for this error kind.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::TooManyAttempts => (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_ATTEMPTS"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            AppError::EmailTaken => (StatusCode::BAD_REQUEST, "EMAIL_TAKEN"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// ErrorBody
///
/// JSON body sent for every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();

        let message = match &self {
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let fields = match self {
            AppError::Validation(fields) => Some(fields),
            _ => None,
        };

        let body = ErrorBody {
            error: code,
            message,
            fields,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(format!("database error: {err}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("background task failed: {err}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;
