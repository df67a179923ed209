//! COD reconciliation workflow.
//!
//! A shipper's daily cash-on-delivery collection is reconciled against what they deposited:
//! PENDING → PROCESSING → DONE. Reaching DONE freezes the figures and credits the deposited
//! amount to the shipper's wallet.

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::ReconciliationService;
pub use types::{CodReconciliation, ReconciliationStatus};
