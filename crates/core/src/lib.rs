//! Core business logic for Coffer.
//!
//! This crate contains the wallet ledger with ZERO web or database dependencies. Storage is
//! reached through the `WalletStore` port; the in-memory implementation lives here and the
//! PostgreSQL one in `coffer-db`.
//!
//! # Modules
//!
//! - `ledger` - Append-only wallet transactions, replay and audit
//! - `wallet` - Wallet accounts and bank info
//! - `enforcer` - The single gate every balance change passes through
//! - `withdrawal` - Withdrawal request state machine
//! - `reconciliation` - COD reconciliation state machine
//! - `settlement` - Settlement outcomes and the unlinked-credit register
//! - `history` - Shipper balance history
//! - `store` - Storage port and in-memory store
//! - `engine` - Locking, retries and commits tying it all together

pub mod enforcer;
pub mod engine;
pub mod error;
pub mod history;
pub mod ledger;
pub mod reconciliation;
pub mod settlement;
pub mod store;
pub mod wallet;
pub mod withdrawal;

pub use engine::{CreatedWallet, NewWithdrawal, WalletEngine};
pub use error::WalletError;
