//! Appending to and replaying a wallet's ledger.

use chrono::{DateTime, Utc};
use coffer_shared::types::{Money, MoneyError, SignedMoney, WalletId, WalletTransactionId};

use crate::error::WalletError;
use crate::ledger::entry::{ReferenceCode, TransactionType, WalletTransaction};
use crate::ledger::error::LedgerError;
use crate::wallet::WalletAccount;

/// Stateless service that builds and verifies ledger entries.
pub struct TransactionLedger;

impl TransactionLedger {
    /// Builds the next entry for `wallet` without committing it.
    ///
    /// The entry starts at the wallet's current balance and takes sequence
    /// `wallet.last_sequence + 1`.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount` is zero
    /// - `InvariantViolation` if the sign of `amount` disagrees with `transaction_type`
    /// - `InsufficientBalance` if a debit would take the balance below zero
    /// - `AmountOverflow` if the balance would overflow
    pub fn append(
        wallet: &WalletAccount,
        transaction_type: TransactionType,
        amount: SignedMoney,
        reference_code: ReferenceCode,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<WalletTransaction, WalletError> {
        if amount.is_zero() {
            return Err(WalletError::InvalidAmount);
        }
        if transaction_type.is_debit() != amount.is_negative() {
            return Err(WalletError::InvariantViolation(format!(
                "{transaction_type} entry cannot carry amount {amount}"
            )));
        }

        let balance_before = wallet.balance;
        let balance_after = amount.apply_to(balance_before).map_err(|err| match err {
            MoneyError::Negative(_) => WalletError::InsufficientBalance {
                available: balance_before,
                requested: amount.magnitude(),
            },
            MoneyError::Overflow => WalletError::AmountOverflow,
        })?;
        let sequence = wallet
            .last_sequence
            .checked_add(1)
            .ok_or(WalletError::AmountOverflow)?;

        Ok(WalletTransaction {
            id: WalletTransactionId::new(),
            wallet_id: wallet.id,
            sequence,
            transaction_type,
            amount,
            balance_before,
            balance_after,
            description: description.into(),
            reference_code,
            created_at: now,
        })
    }

    /// Folds a wallet's entries in sequence order and returns the resulting balance.
    ///
    /// Verifies that sequences are contiguous from 1, that each entry starts where the previous
    /// one ended, and that each entry's arithmetic holds. An empty ledger replays to zero.
    ///
    /// # Errors
    ///
    /// Returns the first `LedgerError` encountered.
    pub fn replay(
        wallet_id: WalletId,
        entries: &[WalletTransaction],
    ) -> Result<Money, LedgerError> {
        let mut ordered: Vec<&WalletTransaction> = entries.iter().collect();
        ordered.sort_by_key(|entry| entry.sequence);

        let mut balance = Money::ZERO;
        for (expected, entry) in (1_i64..).zip(ordered) {
            if entry.wallet_id != wallet_id {
                return Err(LedgerError::ForeignEntry(entry.sequence));
            }
            if entry.sequence != expected {
                return Err(LedgerError::SequenceGap {
                    expected,
                    found: entry.sequence,
                });
            }
            if entry.balance_before != balance {
                return Err(LedgerError::BrokenChain {
                    sequence: entry.sequence,
                    expected: balance,
                    found: entry.balance_before,
                });
            }
            if !entry.arithmetic_holds() {
                return Err(LedgerError::ArithmeticMismatch(entry.sequence));
            }
            balance = entry.balance_after;
        }

        Ok(balance)
    }
}
