use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error taxonomy with fixed HTTP status mappings.
///
/// # Retry semantics
///
/// `EditConflict` is the only error intended to drive a client-side retry
/// (re-fetch, reapply, resubmit). Every other variant is terminal for the
/// request that produced it.
///
/// # Leakage policy
///
/// Persistence and configuration failures carry internal detail for the
/// server log only; clients always receive a generic message for those.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed")]
    ValidationFailed(HashMap<String, String>),

    #[error("resource not found")]
    NotFound,

    #[error("edit conflict: record was modified or deleted concurrently")]
    EditConflict,

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication required")]
    AuthenticationRequired,

    #[error("invalid or expired credentials")]
    InvalidCredentials,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("account not activated")]
    InactiveAccount,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("store operation timed out after {0:?}")]
    StoreTimeout(std::time::Duration),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            other => AppError::Persistence(other.to_string()),
        }
    }
}

/// Error response body. The envelope key is always `error`; the value is a
/// string for most failures and a field-to-message map for validation.
#[derive(Serialize)]
struct ErrorBody {
    error: serde_json::Value,
}

fn error_json(message: &str) -> axum::Json<ErrorBody> {
    axum::Json(ErrorBody {
        error: serde_json::Value::String(message.to_string()),
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Full detail goes to the server log; the client sees sanitized text.
        tracing::error!(error = %self, "Request failed");

        match self {
            AppError::ValidationFailed(errors) => {
                let map = errors
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    axum::Json(ErrorBody {
                        error: serde_json::Value::Object(map),
                    }),
                )
                    .into_response()
            }
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                error_json("the requested resource could not be found"),
            )
                .into_response(),
            AppError::EditConflict => {
                crate::metrics::record_edit_conflict();
                (
                    StatusCode::CONFLICT,
                    error_json(
                        "unable to update the record due to an edit conflict, please try again",
                    ),
                )
                    .into_response()
            }
            AppError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_after_secs.to_string())],
                error_json("rate limit exceeded"),
            )
                .into_response(),
            AppError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                error_json("you must be authenticated to access this resource"),
            )
                .into_response(),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                [("WWW-Authenticate", "Bearer")],
                error_json("invalid or missing authentication token"),
            )
                .into_response(),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                error_json("your user account doesn't have the necessary permissions"),
            )
                .into_response(),
            AppError::InactiveAccount => (
                StatusCode::FORBIDDEN,
                error_json("your user account must be activated to access this resource"),
            )
                .into_response(),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, error_json(&msg)).into_response()
            }
            // Internal failures: generic message only, never the detail.
            AppError::Persistence(_) | AppError::StoreTimeout(_) | AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json("the server encountered a problem and could not process your request"),
            )
                .into_response(),
        }
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
