//! Invariant checks applied before every commit.

use chrono::{DateTime, Utc};

use crate::enforcer::posting::{Posting, PostingKind, PostingPlan};
use crate::error::WalletError;
use crate::ledger::TransactionLedger;
use crate::wallet::WalletAccount;

/// Stateless gatekeeper between a proposed posting and the store.
///
/// The snapshot must already satisfy `balance + pending + withdrawn == earned`; the candidate
/// state is re-checked after the posting is applied. Owner-facing shortfalls surface as
/// `InsufficientBalance`, anything else that would break an invariant is logged with the full
/// wallet context and refused as `InvariantViolation`.
pub struct InvariantEnforcer;

impl InvariantEnforcer {
    /// Validates `posting` against `snapshot` and plans the resulting commit.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for zero postings
    /// - `InsufficientBalance` if a reservation exceeds the balance
    /// - `InvariantViolation` if the snapshot or the candidate state is inconsistent
    /// - `AmountOverflow` if a counter would overflow
    pub fn check(
        snapshot: &WalletAccount,
        posting: &Posting,
        now: DateTime<Utc>,
    ) -> Result<PostingPlan, WalletError> {
        Self::verify(snapshot)?;
        if posting.amount().is_zero() {
            return Err(WalletError::InvalidAmount);
        }

        let mut next = snapshot.clone();
        match posting.kind {
            PostingKind::Credit {
                transaction_type,
                amount,
            } => {
                if transaction_type.is_debit() {
                    return Err(Self::violation(
                        snapshot,
                        format!("{transaction_type} cannot be posted as a credit"),
                    ));
                }
                next.balance = snapshot.balance.checked_add(amount)?;
                next.total_earned = snapshot.total_earned.checked_add(amount)?;
            }
            PostingKind::Reserve { amount } => {
                next.balance = snapshot.balance.checked_sub(amount).map_err(|_| {
                    WalletError::InsufficientBalance {
                        available: snapshot.balance,
                        requested: amount,
                    }
                })?;
                next.pending_amount = snapshot.pending_amount.checked_add(amount)?;
            }
            PostingKind::Release { amount } => {
                next.pending_amount = snapshot.pending_amount.checked_sub(amount).map_err(|_| {
                    Self::violation(
                        snapshot,
                        format!(
                            "release of {amount} exceeds pending amount {}",
                            snapshot.pending_amount
                        ),
                    )
                })?;
                next.balance = snapshot.balance.checked_add(amount)?;
            }
            PostingKind::Settle { amount } => {
                next.pending_amount = snapshot.pending_amount.checked_sub(amount).map_err(|_| {
                    Self::violation(
                        snapshot,
                        format!(
                            "settlement of {amount} exceeds pending amount {}",
                            snapshot.pending_amount
                        ),
                    )
                })?;
                next.total_withdrawn = snapshot.total_withdrawn.checked_add(amount)?;
            }
        }

        let entry = match posting.entry_type() {
            Some(transaction_type) => {
                let entry = TransactionLedger::append(
                    snapshot,
                    transaction_type,
                    posting.entry_amount()?,
                    posting.reference_code.clone(),
                    posting.description.clone(),
                    now,
                )?;
                if entry.balance_after != next.balance {
                    return Err(Self::violation(
                        snapshot,
                        format!(
                            "entry balance {} disagrees with projected balance {}",
                            entry.balance_after, next.balance
                        ),
                    ));
                }
                next.last_sequence = entry.sequence;
                Some(entry)
            }
            None => None,
        };

        next.updated_at = now;
        Self::verify(&next)?;

        Ok(PostingPlan {
            wallet: next,
            entry,
        })
    }

    /// Checks the top-level wallet invariant.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` (after logging the wallet) if it does not hold.
    pub fn verify(wallet: &WalletAccount) -> Result<(), WalletError> {
        if wallet.invariant_holds() {
            return Ok(());
        }
        Err(Self::violation(
            wallet,
            format!(
                "balance {} + pending {} + withdrawn {} != earned {}",
                wallet.balance, wallet.pending_amount, wallet.total_withdrawn, wallet.total_earned
            ),
        ))
    }

    fn violation(wallet: &WalletAccount, detail: String) -> WalletError {
        tracing::error!(
            wallet_id = %wallet.id,
            owner_id = %wallet.owner_id,
            version = wallet.version,
            last_sequence = wallet.last_sequence,
            balance = %wallet.balance,
            pending_amount = %wallet.pending_amount,
            total_earned = %wallet.total_earned,
            total_withdrawn = %wallet.total_withdrawn,
            detail = %detail,
            "Ledger invariant violation, mutation refused"
        );
        WalletError::InvariantViolation(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ReferenceCode, TransactionType};
    use crate::wallet::BankInfo;
    use coffer_shared::types::{Money, OwnerId, SignedMoney, WithdrawalId};

    fn wallet_with(balance: u64, pending: u64, withdrawn: u64) -> WalletAccount {
        let mut wallet = WalletAccount::open(
            OwnerId::new(),
            BankInfo::new("VCB", "0123456789", "SHIPPER B"),
            Utc::now(),
        )
        .unwrap();
        wallet.balance = Money::new(balance);
        wallet.pending_amount = Money::new(pending);
        wallet.total_withdrawn = Money::new(withdrawn);
        wallet.total_earned = Money::new(balance + pending + withdrawn);
        wallet
    }

    fn wdr() -> ReferenceCode {
        ReferenceCode::withdrawal(WithdrawalId::new())
    }

    #[test]
    fn test_credit_raises_balance_and_earned() {
        let wallet = wallet_with(0, 0, 0);
        let posting = Posting::credit(
            TransactionType::OrderPayment,
            Money::new(200_000),
            ReferenceCode::external("ORD-1").unwrap(),
            "Order ORD-1",
        );
        let plan = InvariantEnforcer::check(&wallet, &posting, Utc::now()).unwrap();

        assert_eq!(plan.wallet.balance, Money::new(200_000));
        assert_eq!(plan.wallet.total_earned, Money::new(200_000));
        assert_eq!(plan.wallet.last_sequence, 1);
        assert_eq!(plan.wallet.version, wallet.version);
        let entry = plan.entry.unwrap();
        assert_eq!(entry.amount, SignedMoney::new(200_000));
        assert_eq!(entry.balance_after, Money::new(200_000));
    }

    #[test]
    fn test_reserve_moves_balance_to_pending() {
        let wallet = wallet_with(200_000, 0, 0);
        let posting = Posting::reserve(Money::new(100_000), wdr(), "");
        let plan = InvariantEnforcer::check(&wallet, &posting, Utc::now()).unwrap();

        assert_eq!(plan.wallet.balance, Money::new(100_000));
        assert_eq!(plan.wallet.pending_amount, Money::new(100_000));
        assert_eq!(plan.wallet.total_earned, Money::new(200_000));
        assert_eq!(plan.entry.unwrap().amount, SignedMoney::new(-100_000));
    }

    #[test]
    fn test_reserve_beyond_balance_is_insufficient() {
        let wallet = wallet_with(30_000, 0, 0);
        let posting = Posting::reserve(Money::new(50_000), wdr(), "");
        let err = InvariantEnforcer::check(&wallet, &posting, Utc::now()).unwrap_err();
        assert!(matches!(err, WalletError::InsufficientBalance { .. }));
    }

    #[test]
    fn test_release_and_settle() {
        let wallet = wallet_with(100_000, 100_000, 0);

        let release = Posting::release(Money::new(100_000), wdr(), "");
        let released = InvariantEnforcer::check(&wallet, &release, Utc::now()).unwrap();
        assert_eq!(released.wallet.balance, Money::new(200_000));
        assert_eq!(released.wallet.pending_amount, Money::ZERO);
        assert_eq!(
            released.entry.unwrap().transaction_type,
            TransactionType::Adjustment
        );

        let settle = Posting::settle(Money::new(100_000), wdr(), "");
        let settled = InvariantEnforcer::check(&wallet, &settle, Utc::now()).unwrap();
        assert_eq!(settled.wallet.pending_amount, Money::ZERO);
        assert_eq!(settled.wallet.total_withdrawn, Money::new(100_000));
        assert_eq!(settled.wallet.balance, Money::new(100_000));
        assert_eq!(settled.wallet.last_sequence, wallet.last_sequence);
        assert!(settled.entry.is_none());
    }

    #[test]
    fn test_release_beyond_pending_is_a_violation() {
        let wallet = wallet_with(100_000, 10, 0);
        let posting = Posting::release(Money::new(11), wdr(), "");
        let err = InvariantEnforcer::check(&wallet, &posting, Utc::now()).unwrap_err();
        assert!(matches!(err, WalletError::InvariantViolation(_)));
    }

    #[test]
    fn test_inconsistent_snapshot_is_refused() {
        let mut wallet = wallet_with(100, 0, 0);
        wallet.total_earned = Money::new(99);
        let posting = Posting::credit(
            TransactionType::Adjustment,
            Money::new(1),
            ReferenceCode::external("ADJ-1").unwrap(),
            "",
        );
        assert!(matches!(
            InvariantEnforcer::check(&wallet, &posting, Utc::now()),
            Err(WalletError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_zero_posting_is_invalid() {
        let wallet = wallet_with(100, 0, 0);
        assert!(matches!(
            InvariantEnforcer::check(
                &wallet,
                &Posting::settle(Money::ZERO, wdr(), ""),
                Utc::now(),
            ),
            Err(WalletError::InvalidAmount)
        ));
    }

    #[test]
    fn test_withdrawal_credit_is_a_violation() {
        let wallet = wallet_with(100, 0, 0);
        let posting = Posting::credit(TransactionType::Withdrawal, Money::new(1), wdr(), "");
        assert!(matches!(
            InvariantEnforcer::check(&wallet, &posting, Utc::now()),
            Err(WalletError::InvariantViolation(_))
        ));
    }
}
