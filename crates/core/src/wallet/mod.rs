//! Wallet accounts: the materialized projection of an owner's ledger.
//!
//! # Modules
//!
//! - `types` - `WalletAccount` and `BankInfo`

pub mod types;

pub use types::{BankInfo, WalletAccount};
