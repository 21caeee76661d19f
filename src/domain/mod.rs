//! Domain module
//!
//! Core domain types and business rules.

pub mod amount;
pub mod context;
pub mod error;
pub mod models;
pub mod types;

pub use amount::{to_ledger_scale, Amount, AmountError, Balance, LEDGER_SCALE};
pub use context::{OperationContext, REQUEST_USER_HEADER};
pub use error::DomainError;
pub use models::{
    Account, NewAccount, NewTransaction, NewTransactionSource, Transaction, TransactionSource,
};
pub use types::{
    AccountType, Currency, Direction, TransactionStatus, TransactionType, UnknownVariant,
};
