//! `SeaORM` entity definitions.

pub mod cod_reconciliations;
pub mod shipper_balance_history;
pub mod unlinked_credits;
pub mod wallet_transactions;
pub mod wallets;
pub mod withdrawal_requests;
