//! Operation Context
//!
//! Contains metadata about the current operation for tracing and owner scoping.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the already-authenticated caller
pub const REQUEST_USER_HEADER: &str = "X-Request-User-Id";

/// Context for an operation, used for owner scoping and tracing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationContext {
    /// Name of the API key used for this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_name: Option<String>,

    /// User ID from X-Request-User-Id header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_user_id: Option<Uuid>,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl OperationContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Context acting on behalf of `user_id`
    pub fn for_user(user_id: Uuid) -> Self {
        Self::new().with_request_user(user_id)
    }

    pub fn with_api_key(mut self, name: impl Into<String>) -> Self {
        self.api_key_name = Some(name.into());
        self
    }

    pub fn with_request_user(mut self, user_id: Uuid) -> Self {
        self.request_user_id = Some(user_id);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }

    /// The owner every scoped operation runs as
    pub fn require_user(&self) -> Result<Uuid, AppError> {
        self.request_user_id
            .ok_or_else(|| AppError::MissingHeader(REQUEST_USER_HEADER.to_string()))
    }
}
