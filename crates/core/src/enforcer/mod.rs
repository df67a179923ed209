//! Ledger invariant enforcement.
//!
//! Every balance change is expressed as a `Posting`. The enforcer validates a posting against a
//! wallet snapshot and produces the candidate wallet state plus the ledger entry to commit. It
//! never writes anything itself.
//!
//! # Modules
//!
//! - `posting` - Proposed mutations and their counter effects
//! - `service` - `InvariantEnforcer`

pub mod posting;
pub mod service;

#[cfg(test)]
mod service_props;

pub use posting::{Posting, PostingKind, PostingPlan};
pub use service::InvariantEnforcer;
