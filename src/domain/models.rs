//! Ledger records
//!
//! Plain data records exchanged with the ledger store. Relations are held
//! as ids; nothing here loads related rows on access.

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountType, Amount, Currency, TransactionStatus, TransactionType};

/// An account owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub nickname: String,
    pub account_type: AccountType,
    pub currency: Currency,
    /// Derived state, written only by the balance engine
    pub balance: Decimal,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when opening an account. There is no balance field.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub owner_id: Uuid,
    pub nickname: String,
    pub account_type: AccountType,
    pub currency: Currency,
}

/// A ledger transaction against one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub source_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a transaction
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub source_id: Option<Uuid>,
}

impl NewTransaction {
    /// Materialize the record with a fresh id and timestamp. The timestamp is
    /// cut to microseconds, the precision a `TIMESTAMPTZ` column stores.
    pub fn into_transaction(self) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            account_id: self.account_id,
            transaction_type: self.transaction_type,
            amount: self.amount.value(),
            status: self.status,
            reference: self.reference,
            source_id: self.source_id,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

/// Descriptive tag for where a transaction came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSource {
    pub id: Uuid,
    pub name: String,
    pub source_type: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating or replacing a transaction source
#[derive(Debug, Clone)]
pub struct NewTransactionSource {
    pub name: String,
    pub source_type: String,
    pub description: Option<String>,
}
