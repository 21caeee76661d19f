//! Transaction Handler
//!
//! Records and updates ledger transactions. Every write runs in one unit of
//! work holding the account lock: the row write and the balance update made
//! by the [`BalanceEngine`] commit together or not at all.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::balance::{BalanceEngine, BalanceOutcome, StatusTransition};
use crate::domain::{
    Amount, Balance, DomainError, NewTransaction, OperationContext, Transaction,
    TransactionStatus, TransactionType,
};
use crate::error::AppError;
use crate::identity::validation::optional_text;
use crate::store::{LedgerStore, LedgerUnit, StoreError, TransactionFilter};

use super::{CreateTransactionCommand, UpdateTransactionCommand};

pub const MAX_REFERENCE_LEN: usize = 100;

/// Attempts per unit of work before a concurrency conflict is reported
pub const MAX_RETRIES: u32 = 3;

// =========================================================================
// Retry on concurrency conflict
// =========================================================================

/// Run `op` again when the store reports a serialization failure or deadlock
pub async fn retry_on_conflict<T, F, Fut>(mut op: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    for attempt in 0..MAX_RETRIES {
        match op().await {
            Err(e) if e.is_concurrency_conflict() && attempt < MAX_RETRIES - 1 => {
                let delay = Duration::from_millis(50 * (attempt as u64 + 1));
                tracing::warn!(
                    "Concurrency conflict, retrying (attempt {}/{})",
                    attempt + 1,
                    MAX_RETRIES
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }

    Err(AppError::Persistence(StoreError::ConcurrencyConflict))
}

/// Handler for transaction operations
pub struct TransactionHandler<S> {
    store: Arc<S>,
    engine: BalanceEngine,
}

impl<S: LedgerStore> TransactionHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            engine: BalanceEngine::new(),
        }
    }

    // =========================================================================
    // create_transaction
    // =========================================================================

    /// Record a new transaction; applies the balance when created `completed`
    pub async fn create(
        &self,
        command: CreateTransactionCommand,
        context: &OperationContext,
    ) -> Result<Transaction, AppError> {
        let owner_id = context.require_user()?;

        // Input checks happen before any store access
        let amount: Amount = command.amount.parse().map_err(DomainError::from)?;
        let reference = optional_text("reference", command.reference, MAX_REFERENCE_LEN)?;
        self.check_source(command.source_id).await?;

        let transaction = NewTransaction {
            account_id: command.account_id,
            transaction_type: command.transaction_type,
            amount,
            status: command.status,
            reference,
            source_id: command.source_id,
        }
        .into_transaction();

        let outcome =
            retry_on_conflict(|| self.try_create(owner_id, &transaction, &amount)).await?;

        tracing::info!(
            transaction_id = %transaction.id,
            account_id = %transaction.account_id,
            transaction_type = %transaction.transaction_type,
            amount = %amount,
            status = %transaction.status,
            balance_applied = outcome.is_applied(),
            correlation_id = ?context.correlation_id,
            "Transaction recorded"
        );

        Ok(transaction)
    }

    /// One attempt at the create unit of work
    async fn try_create(
        &self,
        owner_id: Uuid,
        transaction: &Transaction,
        amount: &Amount,
    ) -> Result<BalanceOutcome, AppError> {
        let mut unit = self.begin_owned(owner_id, transaction.account_id).await?;

        if !unit.account().is_open {
            return Err(DomainError::AccountClosed.into());
        }

        if transaction.transaction_type == TransactionType::Withdrawal {
            ensure_funds(&unit, amount)?;
        }

        unit.insert_transaction(transaction).await?;
        let outcome = self
            .engine
            .on_status_transition(&mut unit, transaction, None)
            .await?;
        unit.commit().await?;

        Ok(outcome)
    }

    // =========================================================================
    // update_transaction
    // =========================================================================

    /// Change status and/or reference. The previous status is read under the
    /// account lock, so re-saving a completed row never applies twice.
    pub async fn update(
        &self,
        transaction_id: Uuid,
        command: UpdateTransactionCommand,
        context: &OperationContext,
    ) -> Result<Transaction, AppError> {
        let owner_id = context.require_user()?;
        let reference = match command.reference {
            Some(reference) => Some(optional_text("reference", Some(reference), MAX_REFERENCE_LEN)?),
            None => None,
        };

        let current = self.owned(owner_id, transaction_id).await?;

        let (updated, previous, outcome) = retry_on_conflict(|| {
            self.try_update(owner_id, current.account_id, transaction_id, command.status, &reference)
        })
        .await?;

        tracing::info!(
            transaction_id = %transaction_id,
            previous = %previous,
            current = %updated.status,
            balance_applied = outcome.is_applied(),
            correlation_id = ?context.correlation_id,
            "Transaction updated"
        );

        Ok(updated)
    }

    /// One attempt at the update unit of work.
    /// `reference` is `None` to keep, `Some(None)` to clear.
    async fn try_update(
        &self,
        owner_id: Uuid,
        account_id: Uuid,
        transaction_id: Uuid,
        status: Option<TransactionStatus>,
        reference: &Option<Option<String>>,
    ) -> Result<(Transaction, TransactionStatus, BalanceOutcome), AppError> {
        let mut unit = self.begin_owned(owner_id, account_id).await?;

        let stored = unit
            .transaction(transaction_id)
            .await?
            .ok_or_else(|| DomainError::TransactionNotFound(transaction_id.to_string()))?;
        let previous = stored.status;

        let mut updated = stored;
        if let Some(status) = status {
            updated.status = status;
        }
        if let Some(reference) = reference {
            updated.reference = reference.clone();
        }

        let transition = StatusTransition::new(previous, updated.status);
        if transition.should_apply() && updated.transaction_type == TransactionType::Withdrawal {
            let amount = Amount::new(updated.amount).map_err(DomainError::from)?;
            ensure_funds(&unit, &amount)?;
        }

        unit.update_transaction(&updated).await?;
        let outcome = self
            .engine
            .on_status_transition(&mut unit, &updated, Some(previous))
            .await?;
        unit.commit().await?;

        Ok((updated, previous, outcome))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get(
        &self,
        transaction_id: Uuid,
        context: &OperationContext,
    ) -> Result<Transaction, AppError> {
        self.owned(context.require_user()?, transaction_id).await
    }

    /// Caller's transactions, newest first
    pub async fn list(
        &self,
        filter: &TransactionFilter,
        context: &OperationContext,
    ) -> Result<Vec<Transaction>, AppError> {
        let owner_id = context.require_user()?;
        Ok(self.store.transactions_for_owner(owner_id, filter).await?)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Lock an account owned by the caller
    async fn begin_owned(&self, owner_id: Uuid, account_id: Uuid) -> Result<S::Unit, AppError> {
        let unit = self.store.begin(account_id).await?;
        if unit.account().owner_id != owner_id {
            return Err(DomainError::AccountNotFound(account_id.to_string()).into());
        }
        Ok(unit)
    }

    /// Load a transaction whose account the caller owns
    async fn owned(&self, owner_id: Uuid, transaction_id: Uuid) -> Result<Transaction, AppError> {
        let not_found = || DomainError::TransactionNotFound(transaction_id.to_string());

        let transaction = self
            .store
            .transaction(transaction_id)
            .await?
            .ok_or_else(not_found)?;
        match self.store.account(transaction.account_id).await? {
            Some(account) if account.owner_id == owner_id => Ok(transaction),
            _ => Err(not_found().into()),
        }
    }

    async fn check_source(&self, source_id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(source_id) = source_id {
            if self.store.source(source_id).await?.is_none() {
                return Err(DomainError::validation(format!(
                    "unknown transaction source {}",
                    source_id
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Withdrawal funds check against the balance seen inside the unit
fn ensure_funds<U: LedgerUnit>(unit: &U, amount: &Amount) -> Result<(), AppError> {
    let available = unit.account().balance;
    let balance = Balance::new(available)
        .map_err(|e| AppError::Internal(format!("stored balance out of range: {}", e)))?;

    if !balance.is_sufficient_for(amount) {
        return Err(DomainError::insufficient_funds(amount.value(), available).into());
    }
    Ok(())
}
