//! Order settlements and the unlinked-credit register.
//!
//! Credits for an owner who has no wallet yet are parked in the register instead of being
//! dropped, and are only applied when an operator links them.

pub mod types;

pub use types::{CreditSource, SettlementOutcome, UnlinkedCredit};
