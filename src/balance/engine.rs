//! Balance Update Engine
//!
//! Keeps `account.balance` equal to the signed sum of the account's
//! completed transactions by applying one delta per entry into `completed`.
//! It never recomputes from history and never checks funds.

use rust_decimal::Decimal;

use crate::domain::{Balance, DomainError, Transaction, TransactionStatus};
use crate::error::AppError;
use crate::store::LedgerUnit;

use super::{signed_delta, StatusTransition};

/// What a call to the engine did to the locked account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceOutcome {
    Unchanged,
    Applied { delta: Decimal, balance: Decimal },
}

impl BalanceOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, BalanceOutcome::Applied { .. })
    }
}

/// Stateless balance updater, invoked by the services inside a unit of work
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceEngine;

impl BalanceEngine {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    // on_status_transition
    // =========================================================================

    /// React to a write of `transaction` made through `unit`.
    ///
    /// `transaction` is the row as just written; `previous` is its status
    /// before the write (`None` for a new row). On error the caller must drop
    /// the unit without committing.
    pub async fn on_status_transition<U: LedgerUnit>(
        &self,
        unit: &mut U,
        transaction: &Transaction,
        previous: Option<TransactionStatus>,
    ) -> Result<BalanceOutcome, AppError> {
        let transition = StatusTransition {
            previous,
            current: transaction.status,
        };

        if !transition.should_apply() {
            tracing::trace!(
                transaction_id = %transaction.id,
                previous = ?previous,
                current = %transaction.status,
                "No balance change"
            );
            return Ok(BalanceOutcome::Unchanged);
        }

        if transaction.account_id != unit.account().id {
            return Err(AppError::Internal(format!(
                "transaction {} is not on the locked account {}",
                transaction.id,
                unit.account().id
            )));
        }

        let delta = signed_delta(transaction.transaction_type, transaction.amount)?;

        let current = Balance::new(unit.account().balance)
            .map_err(|e| AppError::Internal(format!("stored balance out of range: {}", e)))?;
        let next = current.apply_delta(delta).map_err(|e| {
            DomainError::validation(format!("resulting balance out of range: {}", e))
        })?;

        unit.set_balance(next.value()).await?;

        tracing::debug!(
            account_id = %transaction.account_id,
            transaction_id = %transaction.id,
            delta = %delta,
            balance = %next,
            "Balance updated"
        );

        Ok(BalanceOutcome::Applied {
            delta,
            balance: next.value(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, AccountType, Currency, TransactionType};
    use crate::store::StoreError;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    /// Unit double that records balance writes
    struct RecordingUnit {
        account: Account,
        writes: Vec<Decimal>,
        fail: bool,
    }

    impl RecordingUnit {
        fn with_balance(balance: Decimal) -> Self {
            let now = Utc::now();
            Self {
                account: Account {
                    id: Uuid::new_v4(),
                    owner_id: Uuid::new_v4(),
                    nickname: "Main".to_string(),
                    account_type: AccountType::Checking,
                    currency: Currency::Usd,
                    balance,
                    is_open: true,
                    created_at: now,
                    updated_at: now,
                },
                writes: Vec::new(),
                fail: false,
            }
        }

        fn tx(&self, kind: TransactionType, amount: Decimal, status: TransactionStatus) -> Transaction {
            Transaction {
                id: Uuid::new_v4(),
                account_id: self.account.id,
                transaction_type: kind,
                amount,
                status,
                reference: None,
                source_id: None,
                created_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl LedgerUnit for RecordingUnit {
        fn account(&self) -> &Account {
            &self.account
        }

        async fn transaction(&mut self, _id: Uuid) -> Result<Option<Transaction>, StoreError> {
            Ok(None)
        }

        async fn insert_transaction(&mut self, _tx: &Transaction) -> Result<(), StoreError> {
            Ok(())
        }

        async fn update_transaction(&mut self, _tx: &Transaction) -> Result<(), StoreError> {
            Ok(())
        }

        async fn set_balance(&mut self, balance: Decimal) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Unavailable("down".to_string()));
            }
            self.writes.push(balance);
            self.account.balance = balance;
            Ok(())
        }

        async fn commit(self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_created_completed_applies_once() {
        let engine = BalanceEngine::new();
        let mut unit = RecordingUnit::with_balance(dec!(0));
        let mut tx = unit.tx(TransactionType::Deposit, dec!(100), TransactionStatus::Completed);

        let outcome = engine.on_status_transition(&mut unit, &tx, None).await.unwrap();
        assert_eq!(
            outcome,
            BalanceOutcome::Applied {
                delta: dec!(100),
                balance: dec!(100)
            }
        );

        // re-save of the same completed row
        tx.reference = Some("edited".to_string());
        let outcome = engine
            .on_status_transition(&mut unit, &tx, Some(TransactionStatus::Completed))
            .await
            .unwrap();
        assert_eq!(outcome, BalanceOutcome::Unchanged);
        assert_eq!(unit.writes, vec![dec!(100)]);
    }

    #[tokio::test]
    async fn test_debits_and_non_completing_writes() {
        let engine = BalanceEngine::new();
        let mut unit = RecordingUnit::with_balance(dec!(50));

        let pending = unit.tx(TransactionType::Withdrawal, dec!(20), TransactionStatus::Pending);
        assert!(!engine
            .on_status_transition(&mut unit, &pending, None)
            .await
            .unwrap()
            .is_applied());

        let failed = unit.tx(TransactionType::Withdrawal, dec!(20), TransactionStatus::Failed);
        engine
            .on_status_transition(&mut unit, &failed, Some(TransactionStatus::Pending))
            .await
            .unwrap();

        let fee = unit.tx(TransactionType::Fee, dec!(60), TransactionStatus::Completed);
        engine
            .on_status_transition(&mut unit, &fee, Some(TransactionStatus::Pending))
            .await
            .unwrap();

        assert_eq!(unit.account.balance, dec!(-10));
        assert_eq!(unit.writes.len(), 1);
    }

    #[tokio::test]
    async fn test_completed_to_cancelled_does_not_reverse() {
        let engine = BalanceEngine::new();
        let mut unit = RecordingUnit::with_balance(dec!(30));
        let tx = unit.tx(TransactionType::Deposit, dec!(30), TransactionStatus::Cancelled);

        let outcome = engine
            .on_status_transition(&mut unit, &tx, Some(TransactionStatus::Completed))
            .await
            .unwrap();
        assert_eq!(outcome, BalanceOutcome::Unchanged);
        assert_eq!(unit.account.balance, dec!(30));
    }

    #[tokio::test]
    async fn test_completed_transfer_is_configuration_error() {
        let engine = BalanceEngine::new();
        let mut unit = RecordingUnit::with_balance(dec!(0));
        let tx = unit.tx(TransactionType::Transfer, dec!(5), TransactionStatus::Completed);

        let err = engine.on_status_transition(&mut unit, &tx, None).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Configuration(_))));
        assert!(unit.writes.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_persistence_error() {
        let engine = BalanceEngine::new();
        let mut unit = RecordingUnit::with_balance(dec!(0));
        unit.fail = true;
        let tx = unit.tx(TransactionType::Deposit, dec!(5), TransactionStatus::Completed);

        let err = engine.on_status_transition(&mut unit, &tx, None).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_overflow_is_validation_error() {
        let engine = BalanceEngine::new();
        let mut unit = RecordingUnit::with_balance(dec!(999999999999999.9999));
        let tx = unit.tx(TransactionType::Deposit, dec!(1), TransactionStatus::Completed);

        let err = engine.on_status_transition(&mut unit, &tx, None).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));
        assert!(unit.writes.is_empty());
    }
}
