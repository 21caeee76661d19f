//! Balance module
//!
//! Derived balance maintenance, driven by transaction status transitions.

mod engine;
mod transition;

pub use engine::{BalanceEngine, BalanceOutcome};
pub use transition::{signed_delta, StatusTransition};
