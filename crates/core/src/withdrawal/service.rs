//! Withdrawal request validation and state transitions.

use coffer_shared::types::Money;

use crate::enforcer::Posting;
use crate::error::WalletError;
use crate::ledger::ReferenceCode;
use crate::wallet::WalletAccount;
use crate::withdrawal::types::{WithdrawalAction, WithdrawalRequest, WithdrawalStatus};

/// Stateless service for the withdrawal workflow.
///
/// Transition methods only decide the next status; the engine turns the accompanying posting
/// into a commit.
pub struct WithdrawalService;

impl WithdrawalService {
    /// Validates a new withdrawal request against the wallet.
    ///
    /// Checks run in order: wallet active, configured minimum, positive amount, available balance.
    ///
    /// # Errors
    ///
    /// - `WalletInactive` if the wallet is locked
    /// - `BelowMinimumWithdrawal` if `amount < minimum`
    /// - `InvalidAmount` if `amount` is zero
    /// - `InsufficientBalance` if `amount > wallet.balance`
    pub fn validate_request(
        wallet: &WalletAccount,
        amount: Money,
        minimum: Money,
    ) -> Result<(), WalletError> {
        if !wallet.is_active {
            return Err(WalletError::WalletInactive(wallet.id));
        }
        if amount < minimum {
            return Err(WalletError::BelowMinimumWithdrawal { amount, minimum });
        }
        if amount.is_zero() {
            return Err(WalletError::InvalidAmount);
        }
        if amount > wallet.balance {
            return Err(WalletError::InsufficientBalance {
                available: wallet.balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Approve a pending request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWithdrawalTransition` unless the request is PENDING.
    pub fn approve(current: WithdrawalStatus) -> Result<WithdrawalStatus, WalletError> {
        Self::transition(current, WithdrawalAction::Approve)
    }

    /// Complete an approved request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWithdrawalTransition` unless the request is APPROVED.
    pub fn complete(current: WithdrawalStatus) -> Result<WithdrawalStatus, WalletError> {
        Self::transition(current, WithdrawalAction::Complete)
    }

    /// Reject a pending or approved request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWithdrawalTransition` unless the request is PENDING or APPROVED.
    pub fn reject(current: WithdrawalStatus) -> Result<WithdrawalStatus, WalletError> {
        Self::transition(current, WithdrawalAction::Reject)
    }

    /// Applies an operator action to a status.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWithdrawalTransition` if the action is not allowed from `current`.
    pub fn transition(
        current: WithdrawalStatus,
        action: WithdrawalAction,
    ) -> Result<WithdrawalStatus, WalletError> {
        let target = action.target();
        if Self::is_valid_transition(current, target) {
            Ok(target)
        } else {
            Err(WalletError::InvalidWithdrawalTransition {
                from: current,
                to: target,
            })
        }
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Pending → Approved (approve)
    /// - Approved → Completed (complete)
    /// - Pending → Rejected (reject)
    /// - Approved → Rejected (reject)
    #[must_use]
    pub fn is_valid_transition(from: WithdrawalStatus, to: WithdrawalStatus) -> bool {
        matches!(
            (from, to),
            (
                WithdrawalStatus::Pending,
                WithdrawalStatus::Approved | WithdrawalStatus::Rejected
            ) | (
                WithdrawalStatus::Approved,
                WithdrawalStatus::Completed | WithdrawalStatus::Rejected
            )
        )
    }

    /// Posting that reserves the funds of a new request.
    #[must_use]
    pub fn reservation(request: &WithdrawalRequest) -> Posting {
        Posting::reserve(
            request.amount,
            ReferenceCode::withdrawal(request.id),
            format!("Withdrawal request {}", request.id),
        )
    }

    /// Posting that accompanies an action, if it moves money.
    ///
    /// Approval is a marker only. Completion settles the reservation and rejection releases it.
    #[must_use]
    pub fn posting_for(action: WithdrawalAction, request: &WithdrawalRequest) -> Option<Posting> {
        let reference = ReferenceCode::withdrawal(request.id);
        match action {
            WithdrawalAction::Approve => None,
            WithdrawalAction::Complete => Some(Posting::settle(
                request.amount,
                reference,
                format!("Withdrawal {} paid out", request.id),
            )),
            WithdrawalAction::Reject => Some(Posting::release(
                request.amount,
                reference,
                format!("Withdrawal {} rejected", request.id),
            )),
        }
    }
}
