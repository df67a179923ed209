//! Ledger replay errors.
//!
//! A ledger that fails replay has been corrupted outside the engine; these errors are reported,
//! never repaired.

use coffer_shared::types::Money;
use thiserror::Error;

/// Faults detected while replaying a wallet's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Entry sequences are not contiguous from 1.
    #[error("Sequence gap: expected {expected}, found {found}")]
    SequenceGap {
        /// The next expected sequence.
        expected: i64,
        /// The sequence that was found.
        found: i64,
    },

    /// An entry does not start where the previous one ended.
    #[error("Broken balance chain at sequence {sequence}: expected {expected}, found {found}")]
    BrokenChain {
        /// The offending entry.
        sequence: i64,
        /// Balance after the previous entry.
        expected: Money,
        /// The entry's recorded `balance_before`.
        found: Money,
    },

    /// `balance_after` differs from `balance_before + amount`.
    #[error("Arithmetic mismatch at sequence {0}")]
    ArithmeticMismatch(i64),

    /// An entry belongs to a different wallet.
    #[error("Entry at sequence {0} belongs to another wallet")]
    ForeignEntry(i64),

    /// Totals overflowed while recomputing the projection.
    #[error("Overflow while recomputing totals")]
    Overflow,
}
