//! Common test utilities

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

use finance_ledger::api::{self, hash_api_key, ApiKeyRing, AppState};
use finance_ledger::config::ApiKeyHash;
use finance_ledger::handlers::RegisterCommand;
use finance_ledger::store::MemoryLedgerStore;

pub const API_KEY: &str = "test_key_123";

/// Key ring accepting [`API_KEY`]
pub fn test_key_ring() -> ApiKeyRing {
    ApiKeyRing::new(vec![ApiKeyHash {
        name: "Test Key".to_string(),
        hash: hash_api_key(API_KEY),
    }])
}

/// Full router over a fresh in-memory store
pub fn memory_app() -> (Router, Arc<MemoryLedgerStore>) {
    let state = AppState::new(MemoryLedgerStore::new(), test_key_ring());
    let store = state.store.clone();
    (api::build_router(state), store)
}

/// Registration payload with valid defaults
pub fn register_command(username: &str, id_number: &str, tax_number: &str) -> RegisterCommand {
    RegisterCommand {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: "correct horse".to_string(),
        password_confirm: "correct horse".to_string(),
        id_number: id_number.to_string(),
        tax_number: tax_number.to_string(),
        phone_number: None,
        date_of_birth: None,
    }
}

/// Send one request through the router and decode the JSON body (Null when empty)
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-API-Key", API_KEY);
    if let Some(user) = user {
        builder = builder.header("X-Request-User-Id", user.to_string());
    }

    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Register through the API and return the new user's id
pub async fn register_user(app: &Router, username: &str, id_number: &str, tax_number: &str) -> Uuid {
    let body = serde_json::to_value(register_command(username, id_number, tax_number)).unwrap();
    let (status, json) = send(app, "POST", "/api/v1/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", json);
    json["user"]["id"].as_str().unwrap().parse().unwrap()
}

/// Connect to DATABASE_URL and migrate; `None` when it is not set.
/// Tests share the database, so each one registers its own user.
pub async fn pg_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    finance_ledger::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Registration payload whose unique fields do not collide across runs
pub fn unique_register_command() -> RegisterCommand {
    let tag = Uuid::new_v4();
    let id_number = format!("{:013}", tag.as_u128() % 10_000_000_000_000);
    let tax_number: String = tag.simple().to_string().chars().take(8).collect();
    register_command(&format!("user-{}", tag.simple()), &id_number, &tax_number)
}
