//! Command definitions
//!
//! Commands represent intentions to change the system state. Amounts travel
//! as strings so no precision is lost before validation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{
    Account, AccountType, Currency, Transaction, TransactionStatus, TransactionType,
};
use crate::identity::{DetailFields, DetailKind, Identity, Profile, ProfileDetail};

// =========================================================================
// Accounts
// =========================================================================

/// Command to open an account for the calling user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountCommand {
    pub nickname: String,
    pub account_type: AccountType,
    pub currency: Currency,
}

impl CreateAccountCommand {
    pub fn new(nickname: impl Into<String>, account_type: AccountType, currency: Currency) -> Self {
        Self {
            nickname: nickname.into(),
            account_type,
            currency,
        }
    }
}

/// Partial update of an account; the balance is not accepted here
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAccountCommand {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub is_open: Option<bool>,
}

/// An account with its transactions nested, newest first
#[derive(Debug, Clone, Serialize)]
pub struct AccountWithTransactions {
    #[serde(flatten)]
    pub account: Account,
    pub transactions: Vec<Transaction>,
}

// =========================================================================
// Transactions
// =========================================================================

/// Command to record a transaction against one of the caller's accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionCommand {
    pub account_id: Uuid,
    #[serde(rename = "type", alias = "transaction_type")]
    pub transaction_type: TransactionType,
    /// Amount to record (as string for precise decimal)
    pub amount: String,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub source_id: Option<Uuid>,
}

impl CreateTransactionCommand {
    pub fn new(account_id: Uuid, transaction_type: TransactionType, amount: impl Into<String>) -> Self {
        Self {
            account_id,
            transaction_type,
            amount: amount.into(),
            status: TransactionStatus::Pending,
            reference: None,
            source_id: None,
        }
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_source(mut self, source_id: Uuid) -> Self {
        self.source_id = Some(source_id);
        self
    }
}

/// Command to move a transaction to a new status and/or change its reference.
/// A blank reference clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTransactionCommand {
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl UpdateTransactionCommand {
    pub fn status(status: TransactionStatus) -> Self {
        Self {
            status: Some(status),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

// =========================================================================
// Transaction sources
// =========================================================================

/// Create or replace a transaction source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCommand {
    pub name: String,
    pub source_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl SourceCommand {
    pub fn new(name: impl Into<String>, source_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type: source_type.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// =========================================================================
// Identity
// =========================================================================

/// Command to register a user with credentials and profile data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub id_number: String,
    pub tax_number: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCommand {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Result of a successful registration or login
#[derive(Debug, Clone, Serialize)]
pub struct UserResult {
    pub user: Identity,
    pub profile: Profile,
}

/// A profile detail as returned to callers; bank account numbers are masked
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDetailResult {
    pub id: Uuid,
    pub kind: DetailKind,
    pub data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileDetail> for ProfileDetailResult {
    fn from(detail: ProfileDetail) -> Self {
        let data = match &detail.fields {
            DetailFields::Address(a) => json!({
                "line1": a.line1,
                "line2": a.line2,
                "city": a.city,
                "province": a.province,
                "postal_code": a.postal_code,
                "country": a.country,
            }),
            DetailFields::TaxResidency(t) => json!({
                "country": t.country,
                "tax_identifier": t.tax_identifier,
                "is_primary": t.is_primary,
            }),
            DetailFields::Banking(b) => json!({
                "bank_name": b.bank_name,
                "account_holder": b.account_holder,
                "account_number": b.masked_account_number(),
                "branch_code": b.branch_code,
                "account_type": b.account_type,
            }),
        };

        Self {
            id: detail.id,
            kind: detail.kind(),
            data,
            updated_at: detail.updated_at,
        }
    }
}
