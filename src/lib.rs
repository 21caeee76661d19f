//! financeLedger Library
//!
//! Account ledger with exactly-once balance updates. Re-exports modules for
//! the server binary, the load driver and integration tests.

pub mod api;
pub mod balance;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod identity;
pub mod store;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorResponse};
pub use domain::{Amount, AmountError, Balance, DomainError, OperationContext};
