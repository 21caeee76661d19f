//! API Middleware
//!
//! API key authentication and request logging.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ApiKeyHash;
use crate::domain::{OperationContext, REQUEST_USER_HEADER};

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

/// Hex SHA-256 of a raw API key, the form keys are configured in
pub fn hash_api_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Accepted API keys, looked up by hash
#[derive(Debug, Clone, Default)]
pub struct ApiKeyRing {
    keys: Vec<ApiKeyHash>,
}

impl ApiKeyRing {
    pub fn new(keys: Vec<ApiKeyHash>) -> Self {
        Self { keys }
    }

    /// Name of the key matching `raw`, if any
    pub fn authenticate(&self, raw: &str) -> Option<&str> {
        let hash = hash_api_key(raw);
        self.keys
            .iter()
            .find(|key| key.hash == hash)
            .map(|key| key.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Request user from X-Request-User-Id header
#[derive(Debug, Clone)]
pub struct RequestUser {
    pub user_id: Uuid,
}

fn reject(status: StatusCode, error: &str, error_code: &str) -> Response {
    (
        status,
        Json(json!({
            "error": error,
            "error_code": error_code
        })),
    )
        .into_response()
}

// =========================================================================
// API Key Authentication Middleware
// =========================================================================

/// Extract and validate API key from X-API-Key header, then build the
/// request's [`OperationContext`]
pub async fn auth_middleware(
    State(api_keys): State<Arc<ApiKeyRing>>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let api_key = match headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        Some(key) => key,
        None => {
            return Err(reject(
                StatusCode::UNAUTHORIZED,
                "Missing X-API-Key header",
                "missing_api_key",
            ));
        }
    };

    let Some(key_name) = api_keys.authenticate(api_key) else {
        tracing::warn!("Rejected request with unknown API key");
        return Err(reject(
            StatusCode::UNAUTHORIZED,
            "Invalid API key",
            "invalid_api_key",
        ));
    };

    // Correlation ID from the caller, or a fresh one
    let correlation_id = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let mut context = OperationContext::new()
        .with_api_key(key_name)
        .with_correlation_id(correlation_id);

    // Owner-scoped endpoints check for the user later via the context
    if let Some(user_id_str) = headers.get(REQUEST_USER_HEADER).and_then(|v| v.to_str().ok()) {
        match Uuid::parse_str(user_id_str) {
            Ok(user_id) => {
                context = context.with_request_user(user_id);
                request.extensions_mut().insert(RequestUser { user_id });
            }
            Err(_) => {
                return Err(reject(
                    StatusCode::BAD_REQUEST,
                    "Invalid X-Request-User-Id header format",
                    "invalid_user_id",
                ));
            }
        }
    }

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["x-api-key", "authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    let headers = mask_headers_for_logging(request.headers());

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        version = ?version,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
