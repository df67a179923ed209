//! Withdrawal request workflow.
//!
//! PENDING → APPROVED → COMPLETED, with PENDING|APPROVED → REJECTED. Creating a request reserves
//! funds, completing it settles them and rejecting it releases them back to the balance.
//!
//! # Modules
//!
//! - `types` - `WithdrawalRequest`, `WithdrawalStatus`, `WithdrawalAction`
//! - `service` - Request validation and the transition table

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::WithdrawalService;
pub use types::{WithdrawalAction, WithdrawalRequest, WithdrawalStatus};
