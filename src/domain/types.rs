//! Ledger enumerations
//!
//! Closed sets of values stored as text columns. Each enum round-trips
//! through `as_str` / `FromStr` so the database layer never sees free text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error raised when a stored or submitted value is not a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Text form used in storage and on the wire
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Kind of account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Savings,
    Checking,
    Investment,
    Retirement,
}

text_enum!(AccountType, "account type", {
    Savings => "savings",
    Checking => "checking",
    Investment => "investment",
    Retirement => "retirement",
});

/// Account currency. No conversion between currencies is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Cad,
}

text_enum!(Currency, "currency", {
    Usd => "USD",
    Eur => "EUR",
    Gbp => "GBP",
    Jpy => "JPY",
    Cad => "CAD",
});

/// Which way a completed transaction moves the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Credit,
    Debit,
}

/// Kind of ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Dividend,
    Transfer,
    Fee,
}

text_enum!(TransactionType, "transaction type", {
    Deposit => "deposit",
    Withdrawal => "withdrawal",
    Dividend => "dividend",
    Transfer => "transfer",
    Fee => "fee",
});

impl TransactionType {
    /// Balance direction, or `None` when the type has no balance rule (transfer)
    pub fn direction(&self) -> Option<Direction> {
        match self {
            TransactionType::Deposit | TransactionType::Dividend => Some(Direction::Credit),
            TransactionType::Withdrawal | TransactionType::Fee => Some(Direction::Debit),
            TransactionType::Transfer => None,
        }
    }
}

/// Lifecycle status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Cancelled,
}

text_enum!(TransactionStatus, "transaction status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});
