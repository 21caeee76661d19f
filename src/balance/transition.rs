//! Status transitions and balance deltas

use rust_decimal::Decimal;

use crate::domain::{Direction, DomainError, TransactionStatus, TransactionType};

/// A single write of a transaction's status, seen from the balance's side.
///
/// `previous` is `None` when the row did not exist before this write, which
/// is distinct from every real status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub previous: Option<TransactionStatus>,
    pub current: TransactionStatus,
}

impl StatusTransition {
    /// First write of a new row
    pub fn created(current: TransactionStatus) -> Self {
        Self {
            previous: None,
            current,
        }
    }

    pub fn new(previous: TransactionStatus, current: TransactionStatus) -> Self {
        Self {
            previous: Some(previous),
            current,
        }
    }

    /// True exactly when the row enters `completed` on this write
    pub fn should_apply(&self) -> bool {
        self.previous != Some(TransactionStatus::Completed)
            && self.current == TransactionStatus::Completed
    }
}

/// Signed balance change of a completed transaction.
/// Transfer has no balance rule and is a configuration error.
pub fn signed_delta(kind: TransactionType, amount: Decimal) -> Result<Decimal, DomainError> {
    match kind.direction() {
        Some(Direction::Credit) => Ok(amount),
        Some(Direction::Debit) => Ok(-amount),
        None => Err(DomainError::Configuration(format!(
            "no balance rule for transaction type '{}'",
            kind
        ))),
    }
}
