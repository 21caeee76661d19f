//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::identity::PasswordError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx, 409 for retryable conflicts)
    #[error("Persistence error: {0}")]
    Persistence(StoreError),

    #[error("Password hashing error: {0}")]
    Password(#[from] PasswordError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Check if the whole unit of work may be retried
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, AppError::Persistence(e) if e.is_concurrency_conflict())
    }
}

/// Store errors with a domain meaning become domain errors; the rest stay
/// persistence failures.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                let id = id.to_string();
                let domain = match entity {
                    "account" => DomainError::AccountNotFound(id),
                    "transaction" => DomainError::TransactionNotFound(id),
                    "transaction source" => DomainError::SourceNotFound(id),
                    _ => DomainError::UserNotFound(id),
                };
                AppError::Domain(domain)
            }
            StoreError::DeleteProtected { entity, id } => {
                AppError::Domain(DomainError::DeleteProtected(format!("{} {}", entity, id)))
            }
            StoreError::UniqueViolation(field) => AppError::Domain(DomainError::Duplicate { field }),
            StoreError::MissingReference(what) => AppError::Domain(DomainError::Validation(
                format!("referenced {} does not exist", what),
            )),
            other => AppError::Persistence(other),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::MissingHeader(header) => {
                (StatusCode::BAD_REQUEST, "missing_header", Some(header.clone()))
            }

            // 401 Unauthorized
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "invalid_api_key", None),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials", None)
            }

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(domain_err) => match domain_err {
                DomainError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_error", Some(msg.clone()))
                }
                DomainError::InvalidAmount(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_amount", Some(msg.clone()))
                }
                DomainError::InsufficientFunds { .. } => (
                    StatusCode::BAD_REQUEST,
                    "insufficient_funds",
                    Some(domain_err.to_string()),
                ),
                DomainError::AccountClosed => (StatusCode::BAD_REQUEST, "account_closed", None),
                DomainError::AccountNotFound(id) => {
                    (StatusCode::NOT_FOUND, "account_not_found", Some(id.clone()))
                }
                DomainError::TransactionNotFound(id) => {
                    (StatusCode::NOT_FOUND, "transaction_not_found", Some(id.clone()))
                }
                DomainError::SourceNotFound(id) => {
                    (StatusCode::NOT_FOUND, "source_not_found", Some(id.clone()))
                }
                DomainError::UserNotFound(id) => {
                    (StatusCode::NOT_FOUND, "user_not_found", Some(id.clone()))
                }
                DomainError::DetailNotFound(what) => {
                    (StatusCode::NOT_FOUND, "detail_not_found", Some(what.clone()))
                }
                DomainError::Configuration(msg) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "configuration_error",
                    Some(msg.clone()),
                ),
                DomainError::DeleteProtected(what) => {
                    (StatusCode::CONFLICT, "delete_protected", Some(what.clone()))
                }
                DomainError::Duplicate { field } => {
                    (StatusCode::CONFLICT, "duplicate", Some(field.clone()))
                }
            },

            // 409 Conflict, 500 Internal Server Error
            AppError::Persistence(e) if e.is_concurrency_conflict() => {
                tracing::warn!("Concurrency conflict survived retries: {}", e);
                (StatusCode::CONFLICT, "concurrency_conflict", None)
            }
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", None)
            }
            AppError::Password(e) => {
                tracing::error!("Password hashing error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
