//! Postgres store tests
//!
//! Skipped unless DATABASE_URL points at a disposable database.

use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::Barrier;

use finance_ledger::domain::{
    AccountType, Currency, DomainError, OperationContext, TransactionStatus, TransactionType,
};
use finance_ledger::handlers::{
    AccountHandler, CreateAccountCommand, CreateTransactionCommand, SourceCommand,
    SourceHandler, TransactionHandler, UpdateTransactionCommand, UserHandler,
};
use finance_ledger::identity::DetailKind;
use finance_ledger::store::{LedgerStore, PgLedgerStore};
use finance_ledger::AppError;

mod common;

macro_rules! pg_store_or_skip {
    () => {
        match common::pg_pool().await {
            Some(pool) => Arc::new(PgLedgerStore::new(pool)),
            None => {
                eprintln!("DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

async fn user_with_account(store: &Arc<PgLedgerStore>) -> (OperationContext, uuid::Uuid) {
    let user = UserHandler::new(store.clone())
        .register(common::unique_register_command())
        .await
        .unwrap();
    let ctx = OperationContext::for_user(user.user.id);
    let account = AccountHandler::new(store.clone())
        .create(
            CreateAccountCommand::new("Everyday", AccountType::Savings, Currency::Eur),
            &ctx,
        )
        .await
        .unwrap();
    (ctx, account.id)
}

#[tokio::test]
async fn test_pg_status_transition_applies_once() {
    let store = pg_store_or_skip!();
    let (ctx, account_id) = user_with_account(&store).await;
    let handler = TransactionHandler::new(store.clone());

    let tx = handler
        .create(
            CreateTransactionCommand::new(account_id, TransactionType::Deposit, "120.1234"),
            &ctx,
        )
        .await
        .unwrap();

    for _ in 0..2 {
        handler
            .update(tx.id, UpdateTransactionCommand::status(TransactionStatus::Completed), &ctx)
            .await
            .unwrap();
    }

    let account = store.account(account_id).await.unwrap().unwrap();
    assert_eq!(account.balance, dec!(120.1234));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_concurrent_withdrawals_never_overdraw() {
    let store = pg_store_or_skip!();
    let (ctx, account_id) = user_with_account(&store).await;

    TransactionHandler::new(store.clone())
        .create(
            CreateTransactionCommand::new(account_id, TransactionType::Deposit, "100")
                .with_status(TransactionStatus::Completed),
            &ctx,
        )
        .await
        .unwrap();

    let tasks = 5;
    let barrier = Arc::new(Barrier::new(tasks));
    let mut handles = Vec::new();
    for _ in 0..tasks {
        let handler = TransactionHandler::new(store.clone());
        let barrier = barrier.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            handler
                .create(
                    CreateTransactionCommand::new(account_id, TransactionType::Withdrawal, "60")
                        .with_status(TransactionStatus::Completed),
                    &ctx,
                )
                .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::Domain(DomainError::InsufficientFunds { .. })) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(succeeded, 1);
    let account = store.account(account_id).await.unwrap().unwrap();
    assert_eq!(account.balance, dec!(40));
}

#[tokio::test]
async fn test_pg_delete_rules() {
    let store = pg_store_or_skip!();
    let (ctx, account_id) = user_with_account(&store).await;

    let source = SourceHandler::new(store.clone())
        .create(SourceCommand::new("Broker", "brokerage"), &ctx)
        .await
        .unwrap();

    let tx = TransactionHandler::new(store.clone())
        .create(
            CreateTransactionCommand::new(account_id, TransactionType::Dividend, "3.5")
                .with_source(source.id),
            &ctx,
        )
        .await
        .unwrap();

    let result = AccountHandler::new(store.clone()).delete(account_id, &ctx).await;
    assert!(matches!(
        result,
        Err(AppError::Domain(DomainError::DeleteProtected(_)))
    ));

    SourceHandler::new(store.clone())
        .delete(source.id, &ctx)
        .await
        .unwrap();
    let stored = store.transaction(tx.id).await.unwrap().unwrap();
    assert_eq!(stored.source_id, None);
    assert_eq!(stored.amount, dec!(3.5));
}

#[tokio::test]
async fn test_pg_duplicate_registration_and_details() {
    let store = pg_store_or_skip!();
    let users = UserHandler::new(store.clone());

    let command = common::unique_register_command();
    let registered = users.register(command.clone()).await.unwrap();

    let mut again = common::unique_register_command();
    again.tax_number = command.tax_number.clone();
    let result = users.register(again).await;
    assert!(matches!(
        result,
        Err(AppError::Domain(DomainError::Duplicate { .. }))
    ));

    let ctx = OperationContext::for_user(registered.user.id);
    let detail = users
        .put_detail(
            DetailKind::Address,
            serde_json::json!({
                "line1": "1 Main Road",
                "city": "Cape Town",
                "province": "Western Cape",
                "postal_code": "8001",
                "country": "ZA"
            }),
            &ctx,
        )
        .await
        .unwrap();

    let profile = users.profile(&ctx).await.unwrap();
    assert_eq!(profile.address_id, Some(detail.id));

    users.delete_detail(DetailKind::Address, &ctx).await.unwrap();
    let profile = users.profile(&ctx).await.unwrap();
    assert_eq!(profile.address_id, None);
}
