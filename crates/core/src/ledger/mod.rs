//! Append-only wallet ledger.
//!
//! This module implements the source of truth for wallet balances:
//! - Ledger entries and their reference codes
//! - Building the next entry for a wallet
//! - Deterministic replay of a wallet's entries
//! - Audit of a stored projection against its ledger

pub mod audit;
pub mod entry;
pub mod error;
pub mod service;

#[cfg(test)]
mod service_props;

pub use audit::AuditReport;
pub use entry::{
    RECONCILIATION_PREFIX, ReferenceCode, TransactionType, WITHDRAWAL_PREFIX, WalletTransaction,
};
pub use error::LedgerError;
pub use service::TransactionLedger;
