//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;

use super::AmountError;

/// Domain-specific errors
///
/// These errors represent business rule violations and domain invariant failures.
/// They are independent of the web/infrastructure layer. Ownership failures are
/// reported as the matching `*NotFound` variant so callers cannot probe for
/// rows they do not own.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Malformed or out-of-range input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid amount (zero, negative, too precise or out of range)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Withdrawal larger than the current balance
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    /// Account is closed and accepts no new transactions
    #[error("Account is closed")]
    AccountClosed,

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Transaction source not found: {0}")]
    SourceNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Profile detail not found: {0}")]
    DetailNotFound(String),

    /// Requested operation has no defined semantics (e.g. completing a transfer)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Deletion blocked by dependent rows
    #[error("Cannot delete {0}: dependent records exist")]
    DeleteProtected(String),

    /// Unique field already taken
    #[error("Duplicate value for {field}")]
    Duplicate { field: String },
}

impl DomainError {
    /// Create an insufficient funds error
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds { required, available }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }

    /// Check if this error hides the existence of a resource
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound(_)
                | Self::TransactionNotFound(_)
                | Self::SourceNotFound(_)
                | Self::UserNotFound(_)
                | Self::DetailNotFound(_)
        )
    }
}

impl From<AmountError> for DomainError {
    fn from(err: AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_error() {
        let err = DomainError::insufficient_funds(Decimal::new(100, 0), Decimal::new(50, 0));

        assert!(err.is_client_error());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("50"));
    }

    #[test]
    fn test_configuration_is_not_client_error() {
        let err = DomainError::Configuration("transfer has no balance rule".to_string());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_amount_error_conversion() {
        let err: DomainError = AmountError::NotPositive(Decimal::ZERO).into();
        assert!(matches!(err, DomainError::InvalidAmount(_)));
    }

    #[test]
    fn test_not_found_variants() {
        assert!(DomainError::AccountNotFound("a".into()).is_not_found());
        assert!(DomainError::SourceNotFound("s".into()).is_not_found());
        assert!(!DomainError::AccountClosed.is_not_found());
    }
}
