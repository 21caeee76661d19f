//! Handler tests against the in-memory store

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    AccountType, Currency, DomainError, OperationContext, TransactionStatus, TransactionType,
};
use crate::error::AppError;
use crate::handlers::{
    AccountHandler, CreateAccountCommand, CreateTransactionCommand, LoginCommand,
    RegisterCommand, SourceCommand, SourceHandler, TransactionHandler, UpdateAccountCommand,
    UpdateTransactionCommand, UserHandler,
};
use crate::identity::{DetailKind, NewIdentity, NewProfile};
use crate::store::{IdentityStore, LedgerStore, MemoryLedgerStore, TransactionFilter};

struct Fixture {
    store: Arc<MemoryLedgerStore>,
    accounts: AccountHandler<MemoryLedgerStore>,
    transactions: TransactionHandler<MemoryLedgerStore>,
    sources: SourceHandler<MemoryLedgerStore>,
    users: UserHandler<MemoryLedgerStore>,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        Self {
            accounts: AccountHandler::new(store.clone()),
            transactions: TransactionHandler::new(store.clone()),
            sources: SourceHandler::new(store.clone()),
            users: UserHandler::new(store.clone()),
            store,
        }
    }

    async fn register(&self, username: &str, id_number: &str, tax_number: &str) -> OperationContext {
        let result = self
            .users
            .register(register_command(username, id_number, tax_number))
            .await
            .unwrap();
        OperationContext::for_user(result.user.id)
    }

    async fn open_account(&self, ctx: &OperationContext) -> Uuid {
        self.accounts
            .create(
                CreateAccountCommand::new("Everyday", AccountType::Checking, Currency::Usd),
                ctx,
            )
            .await
            .unwrap()
            .id
    }

    async fn balance(&self, account_id: Uuid) -> Decimal {
        self.store.account(account_id).await.unwrap().unwrap().balance
    }

    async fn record(
        &self,
        ctx: &OperationContext,
        account_id: Uuid,
        kind: TransactionType,
        amount: &str,
        status: TransactionStatus,
    ) -> Result<Uuid, AppError> {
        self.transactions
            .create(
                CreateTransactionCommand::new(account_id, kind, amount).with_status(status),
                ctx,
            )
            .await
            .map(|tx| tx.id)
    }
}

fn register_command(username: &str, id_number: &str, tax_number: &str) -> RegisterCommand {
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

// =========================================================================
// Balance engine through the service
// =========================================================================

#[tokio::test]
async fn test_created_completed_deposit_applies_once() {
    let fx = Fixture::new();
    let ctx = fx.register("alice", "9001015009087", "1000001").await;
    let account_id = fx.open_account(&ctx).await;

    let tx_id = fx
        .record(&ctx, account_id, TransactionType::Deposit, "100", TransactionStatus::Completed)
        .await
        .unwrap();
    assert_eq!(fx.balance(account_id).await, dec!(100));

    // re-save twice with no status change
    for reference in ["first edit", "second edit"] {
        fx.transactions
            .update(
                tx_id,
                UpdateTransactionCommand::status(TransactionStatus::Completed)
                    .with_reference(reference),
                &ctx,
            )
            .await
            .unwrap();
    }
    assert_eq!(fx.balance(account_id).await, dec!(100));
}

#[tokio::test]
async fn test_balance_tracks_completed_sum() {
    let fx = Fixture::new();
    let ctx = fx.register("bob", "8501015009088", "1000002").await;
    let account_id = fx.open_account(&ctx).await;

    fx.record(&ctx, account_id, TransactionType::Deposit, "250.50", TransactionStatus::Completed)
        .await
        .unwrap();
    let pending_dividend = fx
        .record(&ctx, account_id, TransactionType::Dividend, "10", TransactionStatus::Pending)
        .await
        .unwrap();
    let failing = fx
        .record(&ctx, account_id, TransactionType::Withdrawal, "50", TransactionStatus::Pending)
        .await
        .unwrap();
    fx.record(&ctx, account_id, TransactionType::Fee, "0.5", TransactionStatus::Completed)
        .await
        .unwrap();
    assert_eq!(fx.balance(account_id).await, dec!(250.00));

    fx.transactions
        .update(pending_dividend, UpdateTransactionCommand::status(TransactionStatus::Completed), &ctx)
        .await
        .unwrap();
    fx.transactions
        .update(failing, UpdateTransactionCommand::status(TransactionStatus::Failed), &ctx)
        .await
        .unwrap();

    assert_eq!(fx.balance(account_id).await, dec!(260.00));
}

#[tokio::test]
async fn test_completed_to_cancelled_keeps_balance() {
    let fx = Fixture::new();
    let ctx = fx.register("carol", "7001015009089", "1000003").await;
    let account_id = fx.open_account(&ctx).await;

    let tx_id = fx
        .record(&ctx, account_id, TransactionType::Deposit, "40", TransactionStatus::Completed)
        .await
        .unwrap();
    fx.transactions
        .update(tx_id, UpdateTransactionCommand::status(TransactionStatus::Cancelled), &ctx)
        .await
        .unwrap();

    assert_eq!(fx.balance(account_id).await, dec!(40));
}

// =========================================================================
// Create-time checks
// =========================================================================

#[tokio::test]
async fn test_invalid_amounts_rejected() {
    let fx = Fixture::new();
    let ctx = fx.register("dave", "6001015009080", "1000004").await;
    let account_id = fx.open_account(&ctx).await;

    for amount in ["0", "-5", "1.00001", "abc", "1000000000000000"] {
        let err = fx
            .record(&ctx, account_id, TransactionType::Deposit, amount, TransactionStatus::Completed)
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Domain(DomainError::InvalidAmount(_))),
            "{} -> {:?}",
            amount,
            err
        );
    }

    let all = fx
        .transactions
        .list(&TransactionFilter::default(), &ctx)
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_withdrawal_above_balance_rejected() {
    let fx = Fixture::new();
    let ctx = fx.register("erin", "5001015009081", "1000005").await;
    let account_id = fx.open_account(&ctx).await;

    fx.record(&ctx, account_id, TransactionType::Deposit, "30", TransactionStatus::Completed)
        .await
        .unwrap();
    let err = fx
        .record(&ctx, account_id, TransactionType::Withdrawal, "30.0001", TransactionStatus::Completed)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Domain(DomainError::InsufficientFunds { .. })));
    assert_eq!(fx.balance(account_id).await, dec!(30));
}

#[tokio::test]
async fn test_completing_pending_withdrawal_checks_funds() {
    let fx = Fixture::new();
    let ctx = fx.register("frank", "4001015009082", "1000006").await;
    let account_id = fx.open_account(&ctx).await;

    fx.record(&ctx, account_id, TransactionType::Deposit, "20", TransactionStatus::Completed)
        .await
        .unwrap();
    let first = fx
        .record(&ctx, account_id, TransactionType::Withdrawal, "15", TransactionStatus::Pending)
        .await
        .unwrap();
    let second = fx
        .record(&ctx, account_id, TransactionType::Withdrawal, "15", TransactionStatus::Pending)
        .await
        .unwrap();

    fx.transactions
        .update(first, UpdateTransactionCommand::status(TransactionStatus::Completed), &ctx)
        .await
        .unwrap();
    let err = fx
        .transactions
        .update(second, UpdateTransactionCommand::status(TransactionStatus::Completed), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Domain(DomainError::InsufficientFunds { .. })));
    assert_eq!(fx.balance(account_id).await, dec!(5));
}

#[tokio::test]
async fn test_completed_transfer_is_configuration_error() {
    let fx = Fixture::new();
    let ctx = fx.register("gina", "3001015009083", "1000007").await;
    let account_id = fx.open_account(&ctx).await;

    let err = fx
        .record(&ctx, account_id, TransactionType::Transfer, "5", TransactionStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::Configuration(_))));

    // nothing persisted
    let all = fx
        .transactions
        .list(&TransactionFilter::default(), &ctx)
        .await
        .unwrap();
    assert!(all.is_empty());

    // a pending transfer is accepted and leaves the balance alone
    fx.record(&ctx, account_id, TransactionType::Transfer, "5", TransactionStatus::Pending)
        .await
        .unwrap();
    assert_eq!(fx.balance(account_id).await, dec!(0));
}

#[tokio::test]
async fn test_closed_account_rejects_transactions() {
    let fx = Fixture::new();
    let ctx = fx.register("hank", "2001015009084", "1000008").await;
    let account_id = fx.open_account(&ctx).await;

    let closed = fx.accounts.close(account_id, &ctx).await.unwrap();
    assert!(!closed.is_open);

    let err = fx
        .record(&ctx, account_id, TransactionType::Deposit, "1", TransactionStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::AccountClosed)));
}

#[tokio::test]
async fn test_reference_length_and_unknown_source() {
    let fx = Fixture::new();
    let ctx = fx.register("ivy", "1001015009085", "1000009").await;
    let account_id = fx.open_account(&ctx).await;

    let err = fx
        .transactions
        .create(
            CreateTransactionCommand::new(account_id, TransactionType::Deposit, "1")
                .with_reference("x".repeat(101)),
            &ctx,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));

    let err = fx
        .transactions
        .create(
            CreateTransactionCommand::new(account_id, TransactionType::Deposit, "1")
                .with_source(Uuid::new_v4()),
            &ctx,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));
}

// =========================================================================
// Ownership, deletion and sources
// =========================================================================

#[tokio::test]
async fn test_other_users_rows_are_not_found() {
    let fx = Fixture::new();
    let alice = fx.register("alice", "9001015009087", "2000001").await;
    let mallory = fx.register("mallory", "9101015009086", "2000002").await;
    let account_id = fx.open_account(&alice).await;
    let tx_id = fx
        .record(&alice, account_id, TransactionType::Deposit, "5", TransactionStatus::Completed)
        .await
        .unwrap();

    let err = fx.accounts.get(account_id, &mallory).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::AccountNotFound(_))));

    let err = fx.transactions.get(tx_id, &mallory).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::TransactionNotFound(_))));

    let err = fx
        .record(&mallory, account_id, TransactionType::Deposit, "5", TransactionStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::AccountNotFound(_))));

    let listed = fx
        .transactions
        .list(&TransactionFilter::default(), &mallory)
        .await
        .unwrap();
    assert!(listed.is_empty());
    assert!(fx.accounts.list(&mallory).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_account_protected_by_transactions() {
    let fx = Fixture::new();
    let ctx = fx.register("jack", "8001015009084", "2000003").await;
    let busy = fx.open_account(&ctx).await;
    let empty = fx.open_account(&ctx).await;

    fx.record(&ctx, busy, TransactionType::Deposit, "1", TransactionStatus::Pending)
        .await
        .unwrap();

    let err = fx.accounts.delete(busy, &ctx).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::DeleteProtected(_))));

    fx.accounts.delete(empty, &ctx).await.unwrap();
    assert_eq!(fx.accounts.list(&ctx).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleting_source_nulls_reference() {
    let fx = Fixture::new();
    let ctx = fx.register("kim", "7101015009083", "2000004").await;
    let account_id = fx.open_account(&ctx).await;

    let source = fx
        .sources
        .create(SourceCommand::new("Payroll", "employer").with_description("Monthly salary"), &ctx)
        .await
        .unwrap();
    let tx = fx
        .transactions
        .create(
            CreateTransactionCommand::new(account_id, TransactionType::Deposit, "10")
                .with_source(source.id),
            &ctx,
        )
        .await
        .unwrap();
    assert_eq!(tx.source_id, Some(source.id));

    fx.sources.delete(source.id, &ctx).await.unwrap();

    let reloaded = fx.transactions.get(tx.id, &ctx).await.unwrap();
    assert_eq!(reloaded.source_id, None);
    assert!(matches!(
        fx.sources.get(source.id).await.unwrap_err(),
        AppError::Domain(DomainError::SourceNotFound(_))
    ));
}

#[tokio::test]
async fn test_update_account_keeps_balance() {
    let fx = Fixture::new();
    let ctx = fx.register("lee", "6101015009082", "2000005").await;
    let account_id = fx.open_account(&ctx).await;
    fx.record(&ctx, account_id, TransactionType::Deposit, "12", TransactionStatus::Completed)
        .await
        .unwrap();

    let updated = fx
        .accounts
        .update(
            account_id,
            UpdateAccountCommand {
                nickname: Some("Rainy day".to_string()),
                is_open: None,
            },
            &ctx,
        )
        .await
        .unwrap();

    assert_eq!(updated.nickname, "Rainy day");
    assert!(updated.is_open);
    assert_eq!(updated.balance, dec!(12));
}

#[tokio::test]
async fn test_list_with_transactions_nests_rows() {
    let fx = Fixture::new();
    let ctx = fx.register("mo", "5101015009081", "2000006").await;
    let account_id = fx.open_account(&ctx).await;
    fx.record(&ctx, account_id, TransactionType::Deposit, "1", TransactionStatus::Pending)
        .await
        .unwrap();

    let nested = fx.accounts.list_with_transactions(&ctx).await.unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].transactions.len(), 1);
}

#[tokio::test]
async fn test_list_with_transactions_returns_every_row() {
    let fx = Fixture::new();
    let ctx = fx.register("lee", "6101015009084", "2000007").await;
    let account_id = fx.open_account(&ctx).await;

    let count = TransactionFilter::MAX_LIMIT as usize + 5;
    for _ in 0..count {
        fx.record(&ctx, account_id, TransactionType::Deposit, "1", TransactionStatus::Completed)
            .await
            .unwrap();
    }

    let nested = fx.accounts.list_with_transactions(&ctx).await.unwrap();
    let transactions = &nested[0].transactions;
    assert_eq!(transactions.len(), count);

    let distinct: std::collections::HashSet<Uuid> = transactions.iter().map(|tx| tx.id).collect();
    assert_eq!(distinct.len(), count);
    assert_eq!(fx.balance(account_id).await, Decimal::from(count as u64));
}

#[tokio::test]
async fn test_created_transaction_matches_stored_row() {
    let fx = Fixture::new();
    let ctx = fx.register("kim", "7101015009083", "2000008").await;
    let account_id = fx.open_account(&ctx).await;

    let created = fx
        .transactions
        .create(
            CreateTransactionCommand::new(account_id, TransactionType::Deposit, "2.5"),
            &ctx,
        )
        .await
        .unwrap();

    // timestamps carry no more precision than a TIMESTAMPTZ column keeps
    assert_eq!(created.created_at.timestamp_subsec_nanos() % 1_000, 0);

    let stored = fx.transactions.get(created.id, &ctx).await.unwrap();
    assert_eq!(stored.created_at, created.created_at);
}

#[tokio::test]
async fn test_login_with_unreadable_stored_hash_is_internal() {
    let fx = Fixture::new();
    fx.store
        .register(
            NewIdentity {
                username: "legacy".to_string(),
                email: "legacy@example.com".to_string(),
                password_hash: "plaintext-not-phc".to_string(),
            },
            NewProfile {
                phone_number: None,
                id_number: "6501015009080".to_string(),
                tax_number: "2000009".to_string(),
                date_of_birth: None,
            },
        )
        .await
        .unwrap();

    let result = fx
        .users
        .login(LoginCommand {
            username: "legacy".to_string(),
            password: "anything".to_string(),
        })
        .await;
    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn test_missing_user_is_missing_header() {
    let fx = Fixture::new();
    let err = fx.accounts.list(&OperationContext::new()).await.unwrap_err();
    assert!(matches!(err, AppError::MissingHeader(_)));
}

// =========================================================================
// Identity
// =========================================================================

#[tokio::test]
async fn test_register_duplicates_and_login() {
    let fx = Fixture::new();
    fx.register("nina", "4101015009080", "3000001").await;

    let err = fx
        .users
        .register(register_command("nina", "4201015009089", "3000002"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::Duplicate { ref field }) if field == "username"
    ));

    let err = fx
        .users
        .register(register_command("nina2", "4201015009089", "3000001"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::Duplicate { ref field }) if field == "tax_number"
    ));

    let ok = fx
        .users
        .login(LoginCommand {
            username: "nina".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(ok.user.username, "nina");

    for (username, password) in [("nina", "wrong horse"), ("nobody", "correct horse")] {
        let err = fx
            .users
            .login(LoginCommand {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }
}

#[tokio::test]
async fn test_register_validation() {
    let fx = Fixture::new();

    let mut cmd = register_command("oscar", "123", "3000003");
    let err = fx.users.register(cmd.clone()).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));

    cmd.id_number = "3901015009087".to_string();
    cmd.password_confirm = "something else".to_string();
    let err = fx.users.register(cmd).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));
}

#[tokio::test]
async fn test_profile_detail_lifecycle() {
    let fx = Fixture::new();
    let ctx = fx.register("pat", "3801015009086", "3000004").await;

    let saved = fx
        .users
        .put_detail(
            DetailKind::Banking,
            serde_json::json!({
                "bank_name": "First Bank",
                "account_holder": "Pat",
                "account_number": "62001234567",
                "branch_code": "250655",
                "account_type": "savings"
            }),
            &ctx,
        )
        .await
        .unwrap();
    assert_eq!(saved.data["account_number"], "****4567");

    let profile = fx.users.profile(&ctx).await.unwrap();
    assert_eq!(profile.banking_details_id, Some(saved.id));

    fx.users.delete_detail(DetailKind::Banking, &ctx).await.unwrap();
    let profile = fx.users.profile(&ctx).await.unwrap();
    assert_eq!(profile.banking_details_id, None);

    let err = fx.users.get_detail(DetailKind::Banking, &ctx).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::DetailNotFound(_))));
}
