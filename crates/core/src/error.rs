//! Wallet engine error types.
//!
//! Every error the engine returns is typed. Validation errors are caller-correctable, invariant
//! violations indicate internal inconsistency and are never "fixed" silently, and concurrency
//! errors are retryable.

use chrono::NaiveDate;
use coffer_shared::types::{
    Money, MoneyError, OwnerId, ReconciliationId, UnlinkedCreditId, WalletId, WithdrawalId,
};
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::reconciliation::ReconciliationStatus;
use crate::store::StoreError;
use crate::withdrawal::WithdrawalStatus;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    // ========== Validation Errors ==========
    /// Withdrawal amount is under the configured minimum.
    #[error("Withdrawal amount {amount} is below the minimum of {minimum}")]
    BelowMinimumWithdrawal {
        /// The requested amount.
        amount: Money,
        /// The configured minimum.
        minimum: Money,
    },

    /// The wallet balance does not cover the requested debit.
    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Currently withdrawable balance.
        available: Money,
        /// The requested debit.
        requested: Money,
    },

    /// Withdrawal status transition is not allowed.
    #[error("Invalid withdrawal transition from {from} to {to}")]
    InvalidWithdrawalTransition {
        /// The current status.
        from: WithdrawalStatus,
        /// The attempted target status.
        to: WithdrawalStatus,
    },

    /// Reconciliation status transition is not allowed.
    #[error("Invalid reconciliation transition from {from}")]
    InvalidReconciliationTransition {
        /// The current status.
        from: ReconciliationStatus,
    },

    /// A reconciliation already exists for this shipper and day.
    #[error("Reconciliation already exists for shipper {shipper_id} on {date}")]
    DuplicateReconciliation {
        /// The shipper.
        shipper_id: OwnerId,
        /// The reconciliation day.
        date: NaiveDate,
    },

    /// The owner already has a wallet.
    #[error("Wallet already exists for owner {0}")]
    WalletAlreadyExists(OwnerId),

    /// Bank payout details are incomplete.
    #[error("Bank information is incomplete: {0} is required")]
    MissingBankInfo(&'static str),

    /// The wallet is locked for withdrawals.
    #[error("Wallet {0} is inactive")]
    WalletInactive(WalletId),

    /// Amount must be greater than zero.
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// Reference code is blank, too long, or uses a reserved prefix.
    #[error("Invalid reference code: {0}")]
    InvalidReference(String),

    /// Amount arithmetic overflowed.
    #[error("Amount overflow")]
    AmountOverflow,

    /// Settled reconciliations are immutable.
    #[error("Reconciliation {0} is settled and cannot be modified")]
    ReconciliationSettled(ReconciliationId),

    /// Only settled reconciliations can be corrected.
    #[error("Reconciliation {0} has not settled")]
    ReconciliationNotSettled(ReconciliationId),

    /// A settled reconciliation is corrected at most once; later fixes correct the correction.
    #[error("Reconciliation {0} already has a correction")]
    ReconciliationAlreadyCorrected(ReconciliationId),

    /// A correction may not take back cash that was already credited.
    #[error("Correction lowers deposit from {settled} to {corrected}")]
    DepositReduction {
        /// Deposit credited by the corrected reconciliation.
        settled: Money,
        /// Deposit requested by the correction.
        corrected: Money,
    },

    /// A balance history row already exists for this shipper and day.
    #[error("Balance history already recorded for shipper {shipper_id} on {date}")]
    DuplicateBalanceHistory {
        /// The shipper.
        shipper_id: OwnerId,
        /// The day.
        date: NaiveDate,
    },

    /// Balance history rows must be appended in date order.
    #[error("Balance history for {requested} precedes latest recorded day {latest}")]
    BalanceHistoryOutOfOrder {
        /// Latest recorded day.
        latest: NaiveDate,
        /// The day that was requested.
        requested: NaiveDate,
    },

    // ========== Not Found ==========
    /// No wallet for the owner.
    #[error("Wallet not found for owner {0}")]
    WalletNotFound(OwnerId),

    /// Withdrawal request not found.
    #[error("Withdrawal request not found: {0}")]
    WithdrawalNotFound(WithdrawalId),

    /// Reconciliation not found.
    #[error("Reconciliation not found: {0}")]
    ReconciliationNotFound(ReconciliationId),

    /// Unlinked credit not found.
    #[error("Unlinked credit not found: {0}")]
    UnlinkedCreditNotFound(UnlinkedCreditId),

    // ========== Internal Consistency ==========
    /// A proposed mutation would break an account invariant.
    #[error("Ledger invariant violation: {0}")]
    InvariantViolation(String),

    /// The stored ledger does not replay cleanly.
    #[error("Ledger replay failed: {0}")]
    CorruptLedger(#[from] LedgerError),

    // ========== Concurrency Errors ==========
    /// Optimistic concurrency retries were exhausted.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Storage Errors ==========
    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WalletError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BelowMinimumWithdrawal { .. } => "BELOW_MINIMUM_WITHDRAWAL",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InvalidWithdrawalTransition { .. }
            | Self::InvalidReconciliationTransition { .. } => "INVALID_TRANSITION",
            Self::DuplicateReconciliation { .. } => "DUPLICATE_RECONCILIATION",
            Self::WalletAlreadyExists(_) => "WALLET_ALREADY_EXISTS",
            Self::MissingBankInfo(_) => "MISSING_BANK_INFO",
            Self::WalletInactive(_) => "WALLET_INACTIVE",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InvalidReference(_) => "INVALID_REFERENCE",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::ReconciliationSettled(_) => "RECONCILIATION_SETTLED",
            Self::ReconciliationNotSettled(_) => "RECONCILIATION_NOT_SETTLED",
            Self::ReconciliationAlreadyCorrected(_) => "RECONCILIATION_ALREADY_CORRECTED",
            Self::DepositReduction { .. } => "DEPOSIT_REDUCTION",
            Self::DuplicateBalanceHistory { .. } => "DUPLICATE_BALANCE_HISTORY",
            Self::BalanceHistoryOutOfOrder { .. } => "BALANCE_HISTORY_OUT_OF_ORDER",
            Self::WalletNotFound(_) => "WALLET_NOT_FOUND",
            Self::WithdrawalNotFound(_) => "WITHDRAWAL_NOT_FOUND",
            Self::ReconciliationNotFound(_) => "RECONCILIATION_NOT_FOUND",
            Self::UnlinkedCreditNotFound(_) => "UNLINKED_CREDIT_NOT_FOUND",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Self::CorruptLedger(_) => "CORRUPT_LEDGER",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::MissingBankInfo(_) | Self::InvalidAmount | Self::InvalidReference(_) => 400,

            // 404 Not Found
            Self::WalletNotFound(_)
            | Self::WithdrawalNotFound(_)
            | Self::ReconciliationNotFound(_)
            | Self::UnlinkedCreditNotFound(_) => 404,

            // 409 Conflict - state and uniqueness conflicts
            Self::InvalidWithdrawalTransition { .. }
            | Self::InvalidReconciliationTransition { .. }
            | Self::DuplicateReconciliation { .. }
            | Self::WalletAlreadyExists(_)
            | Self::ReconciliationSettled(_)
            | Self::ReconciliationNotSettled(_)
            | Self::ReconciliationAlreadyCorrected(_)
            | Self::DuplicateBalanceHistory { .. }
            | Self::BalanceHistoryOutOfOrder { .. }
            | Self::ConcurrentModification => 409,

            // 422 Unprocessable - business rule rejections
            Self::BelowMinimumWithdrawal { .. }
            | Self::InsufficientBalance { .. }
            | Self::WalletInactive(_)
            | Self::DepositReduction { .. }
            | Self::AmountOverflow => 422,

            // 500 Internal Server Error
            Self::InvariantViolation(_) | Self::CorruptLedger(_) | Self::Storage(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

impl From<MoneyError> for WalletError {
    fn from(_: MoneyError) -> Self {
        Self::AmountOverflow
    }
}

impl From<StoreError> for WalletError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict(_) | StoreError::StatusConflict(_) => {
                Self::ConcurrentModification
            }
            other => Self::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            WalletError::BelowMinimumWithdrawal {
                amount: Money::new(10),
                minimum: Money::new(50_000),
            }
            .error_code(),
            "BELOW_MINIMUM_WITHDRAWAL"
        );
        assert_eq!(
            WalletError::InvalidReconciliationTransition {
                from: ReconciliationStatus::Done,
            }
            .error_code(),
            "INVALID_TRANSITION"
        );
        assert_eq!(
            WalletError::InvalidWithdrawalTransition {
                from: WithdrawalStatus::Completed,
                to: WithdrawalStatus::Rejected,
            }
            .error_code(),
            "INVALID_TRANSITION"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(WalletError::MissingBankInfo("bank_name").status_code(), 400);
        assert_eq!(
            WalletError::WalletNotFound(OwnerId::from_uuid(uuid::Uuid::nil())).status_code(),
            404
        );
        assert_eq!(WalletError::ConcurrentModification.status_code(), 409);
        assert_eq!(
            WalletError::InsufficientBalance {
                available: Money::ZERO,
                requested: Money::new(50_000),
            }
            .status_code(),
            422
        );
        assert_eq!(
            WalletError::InvariantViolation("drift".to_string()).status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(WalletError::ConcurrentModification.is_retryable());
        assert!(!WalletError::InvalidAmount.is_retryable());
        assert!(!WalletError::Storage("down".to_string()).is_retryable());
    }

    #[test]
    fn test_store_conflicts_become_concurrency_errors() {
        let err: WalletError = StoreError::VersionConflict(WalletId::new()).into();
        assert!(err.is_retryable());

        let err: WalletError = StoreError::Backend("connection reset".to_string()).into();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_error_display() {
        let err = WalletError::InsufficientBalance {
            available: Money::ZERO,
            requested: Money::new(50_000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance: available 0, requested 50000"
        );

        let err = WalletError::InvalidWithdrawalTransition {
            from: WithdrawalStatus::Pending,
            to: WithdrawalStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Invalid withdrawal transition from PENDING to COMPLETED"
        );
    }
}
