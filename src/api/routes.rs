//! API Routes
//!
//! HTTP endpoint definitions. Every handler receives the request's
//! [`OperationContext`] from the auth middleware; owner-scoped endpoints
//! fail with `missing_header` when it carries no user.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{Account, DomainError, OperationContext, Transaction, TransactionSource};
use crate::error::AppError;
use crate::handlers::{
    AccountHandler, CreateAccountCommand, CreateTransactionCommand, LoginCommand,
    ProfileDetailResult, RegisterCommand, SourceCommand, SourceHandler, TransactionHandler,
    UpdateAccountCommand, UpdateTransactionCommand, UserHandler, UserResult,
};
use crate::identity::{DetailKind, Profile};
use crate::store::{IdentityStore, LedgerStore, TransactionFilter};

use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AccountListQuery {
    #[serde(default)]
    pub include_transactions: bool,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<S>() -> Router<AppState<S>>
where
    S: LedgerStore + IdentityStore,
{
    Router::new()
        // Identity
        .route("/auth/register", post(register::<S>))
        .route("/auth/login", post(login::<S>))
        // Accounts
        .route("/accounts", get(list_accounts::<S>).post(create_account::<S>))
        .route(
            "/accounts/:account_id",
            get(get_account::<S>)
                .patch(update_account::<S>)
                .delete(delete_account::<S>),
        )
        .route("/accounts/:account_id/close", post(close_account::<S>))
        // Transactions
        .route(
            "/transactions",
            get(list_transactions::<S>).post(create_transaction::<S>),
        )
        .route(
            "/transactions/:transaction_id",
            get(get_transaction::<S>).patch(update_transaction::<S>),
        )
        // Transaction sources
        .route(
            "/transaction-sources",
            get(list_sources::<S>).post(create_source::<S>),
        )
        .route(
            "/transaction-sources/:source_id",
            get(get_source::<S>)
                .patch(update_source::<S>)
                .delete(delete_source::<S>),
        )
        // Profile
        .route("/profile", get(get_profile::<S>))
        .route(
            "/profile/:kind",
            get(get_detail::<S>)
                .put(put_detail::<S>)
                .delete(delete_detail::<S>),
        )
}

// =========================================================================
// Identity
// =========================================================================

/// POST /auth/register
async fn register<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Json(command): Json<RegisterCommand>,
) -> Result<(StatusCode, Json<UserResult>), AppError> {
    let result = UserHandler::new(state.store).register(command).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST /auth/login
async fn login<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Json(command): Json<LoginCommand>,
) -> Result<Json<UserResult>, AppError> {
    let result = UserHandler::new(state.store).login(command).await?;
    Ok(Json(result))
}

// =========================================================================
// Accounts
// =========================================================================

/// GET /accounts (`?include_transactions=true` nests each account's rows)
async fn list_accounts<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Query(query): Query<AccountListQuery>,
) -> Result<Response, AppError> {
    let handler = AccountHandler::new(state.store);

    if query.include_transactions {
        let accounts = handler.list_with_transactions(&context).await?;
        Ok(Json(accounts).into_response())
    } else {
        let accounts = handler.list(&context).await?;
        Ok(Json(accounts).into_response())
    }
}

/// POST /accounts
async fn create_account<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Json(command): Json<CreateAccountCommand>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let account = AccountHandler::new(state.store)
        .create(command, &context)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /accounts/:account_id
async fn get_account<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Account>, AppError> {
    let account = AccountHandler::new(state.store)
        .get(account_id, &context)
        .await?;
    Ok(Json(account))
}

/// PATCH /accounts/:account_id
async fn update_account<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<Uuid>,
    Json(command): Json<UpdateAccountCommand>,
) -> Result<Json<Account>, AppError> {
    let account = AccountHandler::new(state.store)
        .update(account_id, command, &context)
        .await?;
    Ok(Json(account))
}

/// POST /accounts/:account_id/close
async fn close_account<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Account>, AppError> {
    let account = AccountHandler::new(state.store)
        .close(account_id, &context)
        .await?;
    Ok(Json(account))
}

/// DELETE /accounts/:account_id
async fn delete_account<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    AccountHandler::new(state.store)
        .delete(account_id, &context)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Transactions
// =========================================================================

/// GET /transactions
async fn list_transactions<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let transactions = TransactionHandler::new(state.store)
        .list(&filter, &context)
        .await?;
    Ok(Json(transactions))
}

/// POST /transactions
async fn create_transaction<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Json(command): Json<CreateTransactionCommand>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let transaction = TransactionHandler::new(state.store)
        .create(command, &context)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET /transactions/:transaction_id
async fn get_transaction<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = TransactionHandler::new(state.store)
        .get(transaction_id, &context)
        .await?;
    Ok(Json(transaction))
}

/// PATCH /transactions/:transaction_id
async fn update_transaction<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(transaction_id): Path<Uuid>,
    Json(command): Json<UpdateTransactionCommand>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = TransactionHandler::new(state.store)
        .update(transaction_id, command, &context)
        .await?;
    Ok(Json(transaction))
}

// =========================================================================
// Transaction sources
// =========================================================================

/// GET /transaction-sources
async fn list_sources<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<TransactionSource>>, AppError> {
    let sources = SourceHandler::new(state.store).list().await?;
    Ok(Json(sources))
}

/// POST /transaction-sources
async fn create_source<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Json(command): Json<SourceCommand>,
) -> Result<(StatusCode, Json<TransactionSource>), AppError> {
    let source = SourceHandler::new(state.store)
        .create(command, &context)
        .await?;
    Ok((StatusCode::CREATED, Json(source)))
}

/// GET /transaction-sources/:source_id
async fn get_source<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Path(source_id): Path<Uuid>,
) -> Result<Json<TransactionSource>, AppError> {
    let source = SourceHandler::new(state.store).get(source_id).await?;
    Ok(Json(source))
}

/// PATCH /transaction-sources/:source_id
async fn update_source<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Path(source_id): Path<Uuid>,
    Json(command): Json<SourceCommand>,
) -> Result<Json<TransactionSource>, AppError> {
    let source = SourceHandler::new(state.store)
        .update(source_id, command)
        .await?;
    Ok(Json(source))
}

/// DELETE /transaction-sources/:source_id
async fn delete_source<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(source_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    SourceHandler::new(state.store)
        .delete(source_id, &context)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Profile
// =========================================================================

fn detail_kind(segment: &str) -> Result<DetailKind, AppError> {
    segment
        .parse()
        .map_err(|_| DomainError::DetailNotFound(segment.to_string()).into())
}

/// GET /profile
async fn get_profile<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<Profile>, AppError> {
    let profile = UserHandler::new(state.store).profile(&context).await?;
    Ok(Json(profile))
}

/// GET /profile/{address,tax-residency,banking-details}
async fn get_detail<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(kind): Path<String>,
) -> Result<Json<ProfileDetailResult>, AppError> {
    let detail = UserHandler::new(state.store)
        .get_detail(detail_kind(&kind)?, &context)
        .await?;
    Ok(Json(detail))
}

/// PUT /profile/{address,tax-residency,banking-details}
async fn put_detail<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(kind): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ProfileDetailResult>, AppError> {
    let detail = UserHandler::new(state.store)
        .put_detail(detail_kind(&kind)?, body, &context)
        .await?;
    Ok(Json(detail))
}

/// DELETE /profile/{address,tax-residency,banking-details}
async fn delete_detail<S: LedgerStore + IdentityStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(kind): Path<String>,
) -> Result<StatusCode, AppError> {
    UserHandler::new(state.store)
        .delete_detail(detail_kind(&kind)?, &context)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
