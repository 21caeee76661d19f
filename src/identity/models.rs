//! Identity and profile records
//!
//! A user is an [`Identity`] (login credentials) composed with a [`Profile`]
//! (personal data) that points at optional detail records by id.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::UnknownVariant;

/// Login identity. `password_hash` is the credential reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Personal data attached to an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub phone_number: Option<String>,
    pub id_number: String,
    pub tax_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub address_id: Option<Uuid>,
    pub tax_residency_id: Option<Uuid>,
    pub banking_details_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub phone_number: Option<String>,
    pub id_number: String,
    pub tax_number: String,
    pub date_of_birth: Option<NaiveDate>,
}

impl Profile {
    /// Id of the linked detail record of `kind`, if any
    pub fn detail_id(&self, kind: DetailKind) -> Option<Uuid> {
        match kind {
            DetailKind::Address => self.address_id,
            DetailKind::TaxResidency => self.tax_residency_id,
            DetailKind::Banking => self.banking_details_id,
        }
    }

    /// Point the `kind` reference at `id` (or clear it)
    pub fn set_detail_id(&mut self, kind: DetailKind, id: Option<Uuid>) {
        match kind {
            DetailKind::Address => self.address_id = id,
            DetailKind::TaxResidency => self.tax_residency_id = id,
            DetailKind::Banking => self.banking_details_id = id,
        }
    }
}

/// Which profile sub-resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    Address,
    TaxResidency,
    Banking,
}

impl DetailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailKind::Address => "address",
            DetailKind::TaxResidency => "tax_residency",
            DetailKind::Banking => "banking",
        }
    }
}

impl fmt::Display for DetailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailKind {
    type Err = UnknownVariant;

    /// Accepts the URL segment form (`tax-residency`) as well as the snake form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "address" => Ok(DetailKind::Address),
            "tax_residency" | "tax-residency" => Ok(DetailKind::TaxResidency),
            "banking" | "banking-details" | "banking_details" => Ok(DetailKind::Banking),
            other => Err(UnknownVariant {
                kind: "profile detail",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressFields {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxResidencyFields {
    pub country: String,
    pub tax_identifier: String,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankingFields {
    pub bank_name: String,
    pub account_holder: String,
    pub account_number: String,
    pub branch_code: String,
    pub account_type: String,
}

impl BankingFields {
    /// Account number with everything but the last 4 characters hidden
    pub fn masked_account_number(&self) -> String {
        mask_account_number(&self.account_number)
    }
}

/// Mask all but the last 4 characters: `"1234567890"` → `"****7890"`
pub fn mask_account_number(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    let visible: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{}", visible)
}

/// Content of one profile sub-resource
#[derive(Debug, Clone, PartialEq)]
pub enum DetailFields {
    Address(AddressFields),
    TaxResidency(TaxResidencyFields),
    Banking(BankingFields),
}

impl DetailFields {
    pub fn kind(&self) -> DetailKind {
        match self {
            DetailFields::Address(_) => DetailKind::Address,
            DetailFields::TaxResidency(_) => DetailKind::TaxResidency,
            DetailFields::Banking(_) => DetailKind::Banking,
        }
    }
}

/// A stored profile sub-resource
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDetail {
    pub id: Uuid,
    pub fields: DetailFields,
    pub updated_at: DateTime<Utc>,
}

impl ProfileDetail {
    pub fn kind(&self) -> DetailKind {
        self.fields.kind()
    }
}
