//! Repository implementations.

mod mapping;
pub mod wallet_store;

pub use wallet_store::PgWalletStore;
