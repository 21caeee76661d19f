//! Identity module
//!
//! Credentials, profile records and registration input checks.

pub mod models;
pub mod password;
pub mod validation;

pub use models::{
    mask_account_number, AddressFields, BankingFields, DetailFields, DetailKind, Identity,
    NewIdentity, NewProfile, Profile, ProfileDetail, TaxResidencyFields,
};
pub use password::{hash_password, verify_password, PasswordError};
