//! Shipper daily balance history.
//!
//! Each row carries a shipper's cash on hand from one day into the next:
//! `final = opening + collected - deposited + bonus`, and each day opens at the previous day's
//! final balance.

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::{BalanceHistoryService, ContinuityError};
pub use types::ShipperBalanceHistory;
