//! Command Handlers module
//!
//! Service layer over the store traits. Handlers validate input, enforce
//! owner scoping and run each ledger write inside one unit of work.

mod account_handler;
mod commands;
mod source_handler;
mod transaction_handler;
mod user_handler;

#[cfg(test)]
mod tests;

pub use account_handler::AccountHandler;
pub use commands::*;
pub use source_handler::SourceHandler;
pub use transaction_handler::{retry_on_conflict, TransactionHandler, MAX_REFERENCE_LEN, MAX_RETRIES};
pub use user_handler::UserHandler;
