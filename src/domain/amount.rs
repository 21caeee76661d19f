//! Amount type
//!
//! Domain primitives for monetary values stored as `NUMERIC(19,4)`.
//! All amounts are validated at construction time, ensuring invalid values
//! cannot exist in the system.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fractional digits kept for every monetary column
pub const LEDGER_SCALE: u32 = 4;

/// Total digits of a monetary column (precision of `NUMERIC(19,4)`)
pub const LEDGER_PRECISION: u32 = 19;

/// Largest magnitude representable in `NUMERIC(19,4)`: 999_999_999_999_999.9999
fn max_magnitude() -> Decimal {
    Decimal::from_i128_with_scale(9_999_999_999_999_999_999, LEDGER_SCALE)
}

/// Rescale a decimal to the ledger scale without changing its value.
///
/// Callers must have checked that the scale is at most [`LEDGER_SCALE`].
pub fn to_ledger_scale(value: Decimal) -> Decimal {
    let mut value = value;
    value.rescale(LEDGER_SCALE);
    value
}

/// Amount represents a validated transaction amount.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 4 decimal places
/// - Fits in `NUMERIC(19,4)`
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use finance_ledger::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(100, 0)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(100, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {LEDGER_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds the {LEDGER_PRECISION}-digit ledger range")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 4 decimal places
    /// - `AmountError::Overflow` if value does not fit `NUMERIC(19,4)`
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        let value = value.normalize();
        if value.scale() > LEDGER_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        if value > max_magnitude() {
            return Err(AmountError::Overflow);
        }

        Ok(Self(to_ledger_scale(value)))
    }

    /// Create an Amount from an integer (no decimal places).
    pub fn from_integer(value: i64) -> Result<Self, AmountError> {
        Self::new(Decimal::from(value))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())
            .map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        format!("{:.4}", amount.0)
    }
}

/// Balance represents an account balance.
///
/// Unlike Amount, a balance may be zero or negative (fees are debited
/// without a funds check), but it must stay within the ledger range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance(Decimal);

impl Balance {
    /// Create a balance from a stored value
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.abs() > max_magnitude() {
            return Err(AmountError::Overflow);
        }
        if value.normalize().scale() > LEDGER_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        Ok(Self(to_ledger_scale(value)))
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(to_ledger_scale(Decimal::ZERO))
    }

    /// Get the underlying value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance covers a withdrawal of `amount`
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add a signed delta, staying inside the ledger range
    pub fn apply_delta(&self, delta: Decimal) -> Result<Balance, AmountError> {
        let next = self.0.checked_add(delta).ok_or(AmountError::Overflow)?;
        Balance::new(next)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}
