//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::store::{IdentityStore, LedgerStore};

pub use middleware::{hash_api_key, ApiKeyRing};
pub use routes::create_router;

/// Shared state of the HTTP layer
pub struct AppState<S> {
    pub store: Arc<S>,
    pub api_keys: Arc<ApiKeyRing>,
}

impl<S> AppState<S> {
    pub fn new(store: S, api_keys: ApiKeyRing) -> Self {
        Self {
            store: Arc::new(store),
            api_keys: Arc::new(api_keys),
        }
    }
}

// Not derived: that would require `S: Clone`
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            api_keys: self.api_keys.clone(),
        }
    }
}

/// Build the application router
pub fn build_router<S>(state: AppState<S>) -> Router
where
    S: LedgerStore + IdentityStore,
{
    // Axum layers are applied in reverse order (last added = first executed)
    // Order: logging -> auth -> handler
    let protected_routes = create_router::<S>()
        .layer(axum::middleware::from_fn_with_state(
            state.api_keys.clone(),
            middleware::auth_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::logging_middleware));

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .nest("/api/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
