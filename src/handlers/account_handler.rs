//! Account Handler
//!
//! Opening, reading, editing, closing and deleting a caller's accounts.
//! Accounts of other users are reported as not found.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Account, DomainError, NewAccount, OperationContext, Transaction};
use crate::error::AppError;
use crate::identity::validation::required_text;
use crate::store::{LedgerStore, TransactionFilter};

use super::{AccountWithTransactions, CreateAccountCommand, UpdateAccountCommand};

pub const MAX_NICKNAME_LEN: usize = 100;

/// Handler for account operations
pub struct AccountHandler<S> {
    store: Arc<S>,
}

impl<S: LedgerStore> AccountHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Load an account owned by the caller
    async fn owned(&self, owner_id: Uuid, account_id: Uuid) -> Result<Account, AppError> {
        match self.store.account(account_id).await? {
            Some(account) if account.owner_id == owner_id => Ok(account),
            _ => Err(DomainError::AccountNotFound(account_id.to_string()).into()),
        }
    }

    pub async fn create(
        &self,
        command: CreateAccountCommand,
        context: &OperationContext,
    ) -> Result<Account, AppError> {
        let owner_id = context.require_user()?;
        let nickname = required_text("nickname", &command.nickname, MAX_NICKNAME_LEN)?;

        let account = self
            .store
            .insert_account(NewAccount {
                owner_id,
                nickname,
                account_type: command.account_type,
                currency: command.currency,
            })
            .await?;

        tracing::info!(
            account_id = %account.id,
            owner_id = %owner_id,
            account_type = %account.account_type,
            currency = %account.currency,
            "Account opened"
        );

        Ok(account)
    }

    pub async fn get(&self, account_id: Uuid, context: &OperationContext) -> Result<Account, AppError> {
        self.owned(context.require_user()?, account_id).await
    }

    pub async fn list(&self, context: &OperationContext) -> Result<Vec<Account>, AppError> {
        let owner_id = context.require_user()?;
        Ok(self.store.accounts_for_owner(owner_id).await?)
    }

    /// Accounts with their transactions nested (`?include_transactions=true`)
    pub async fn list_with_transactions(
        &self,
        context: &OperationContext,
    ) -> Result<Vec<AccountWithTransactions>, AppError> {
        let owner_id = context.require_user()?;
        let accounts = self.store.accounts_for_owner(owner_id).await?;

        let mut result = Vec::with_capacity(accounts.len());
        for account in accounts {
            let transactions = self.all_transactions(owner_id, account.id).await?;
            result.push(AccountWithTransactions {
                account,
                transactions,
            });
        }
        Ok(result)
    }

    /// Every transaction of one account, newest first, fetched page by page
    async fn all_transactions(
        &self,
        owner_id: Uuid,
        account_id: Uuid,
    ) -> Result<Vec<Transaction>, AppError> {
        let page_size = TransactionFilter::MAX_LIMIT;
        let mut filter = TransactionFilter {
            limit: Some(page_size),
            ..TransactionFilter::for_account(account_id)
        };

        let mut transactions = Vec::new();
        let mut offset = 0;
        loop {
            filter.offset = Some(offset);
            let page = self.store.transactions_for_owner(owner_id, &filter).await?;
            let len = page.len() as i64;
            transactions.extend(page);
            if len < page_size {
                return Ok(transactions);
            }
            offset += page_size;
        }
    }

    pub async fn update(
        &self,
        account_id: Uuid,
        command: UpdateAccountCommand,
        context: &OperationContext,
    ) -> Result<Account, AppError> {
        let current = self.owned(context.require_user()?, account_id).await?;

        let nickname = match command.nickname {
            Some(nickname) => required_text("nickname", &nickname, MAX_NICKNAME_LEN)?,
            None => current.nickname,
        };
        let is_open = command.is_open.unwrap_or(current.is_open);

        let account = self
            .store
            .update_account_details(account_id, &nickname, is_open)
            .await?;

        tracing::info!(account_id = %account_id, is_open, "Account updated");
        Ok(account)
    }

    /// Mark the account closed; closed accounts accept no new transactions
    pub async fn close(&self, account_id: Uuid, context: &OperationContext) -> Result<Account, AppError> {
        self.update(
            account_id,
            UpdateAccountCommand {
                nickname: None,
                is_open: Some(false),
            },
            context,
        )
        .await
    }

    /// Hard delete; rejected while the account has transactions
    pub async fn delete(&self, account_id: Uuid, context: &OperationContext) -> Result<(), AppError> {
        self.owned(context.require_user()?, account_id).await?;
        self.store.delete_account(account_id).await?;

        tracing::info!(account_id = %account_id, "Account deleted");
        Ok(())
    }
}
