//! Recomputing a wallet projection from its ledger.

use coffer_shared::types::{Money, WalletId};
use serde::Serialize;

use crate::ledger::entry::WalletTransaction;
use crate::ledger::error::LedgerError;
use crate::ledger::service::TransactionLedger;
use crate::wallet::WalletAccount;
use crate::withdrawal::{WithdrawalRequest, WithdrawalStatus};

/// Stored projection next to the values recomputed from the ledger and withdrawal rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Audited wallet.
    pub wallet_id: WalletId,
    /// Number of ledger entries replayed.
    pub entry_count: usize,
    /// Stored `last_sequence`.
    pub stored_last_sequence: i64,
    /// Stored balance.
    pub stored_balance: Money,
    /// Balance after replaying the ledger.
    pub ledger_balance: Money,
    /// Stored lifetime credits.
    pub stored_total_earned: Money,
    /// Sum of credit entries, excluding withdrawal releases.
    pub ledger_total_earned: Money,
    /// Stored reservation total.
    pub stored_pending_amount: Money,
    /// Sum of open withdrawal requests.
    pub open_withdrawals: Money,
    /// Stored lifetime withdrawals.
    pub stored_total_withdrawn: Money,
    /// Sum of completed withdrawal requests.
    pub completed_withdrawals: Money,
    /// True if every recomputed value matches the stored one.
    pub consistent: bool,
}

impl AuditReport {
    /// Names the stored fields that disagree with the ledger.
    #[must_use]
    pub fn mismatches(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.stored_balance != self.ledger_balance {
            fields.push("balance");
        }
        if self.stored_total_earned != self.ledger_total_earned {
            fields.push("total_earned");
        }
        if self.stored_pending_amount != self.open_withdrawals {
            fields.push("pending_amount");
        }
        if self.stored_total_withdrawn != self.completed_withdrawals {
            fields.push("total_withdrawn");
        }
        if usize::try_from(self.stored_last_sequence).ok() != Some(self.entry_count) {
            fields.push("last_sequence");
        }
        fields
    }
}

impl TransactionLedger {
    /// Audits a wallet's stored projection.
    ///
    /// # Errors
    ///
    /// Returns a `LedgerError` if the ledger does not replay cleanly or totals overflow.
    pub fn audit(
        wallet: &WalletAccount,
        entries: &[WalletTransaction],
        withdrawals: &[WithdrawalRequest],
    ) -> Result<AuditReport, LedgerError> {
        let ledger_balance = Self::replay(wallet.id, entries)?;

        let ledger_total_earned = Money::try_sum(
            entries
                .iter()
                .filter(|entry| !entry.amount.is_negative() && !entry.is_withdrawal_release())
                .map(|entry| entry.amount.magnitude()),
        )
        .map_err(|_| LedgerError::Overflow)?;

        let sum_where = |wanted: fn(WithdrawalStatus) -> bool| {
            Money::try_sum(
                withdrawals
                    .iter()
                    .filter(|request| request.wallet_id == wallet.id && wanted(request.status))
                    .map(|request| request.amount),
            )
            .map_err(|_| LedgerError::Overflow)
        };
        let open_withdrawals = sum_where(|status| status.is_open())?;
        let completed_withdrawals = sum_where(|status| status == WithdrawalStatus::Completed)?;

        let mut report = AuditReport {
            wallet_id: wallet.id,
            entry_count: entries.len(),
            stored_last_sequence: wallet.last_sequence,
            stored_balance: wallet.balance,
            ledger_balance,
            stored_total_earned: wallet.total_earned,
            ledger_total_earned,
            stored_pending_amount: wallet.pending_amount,
            open_withdrawals,
            stored_total_withdrawn: wallet.total_withdrawn,
            completed_withdrawals,
            consistent: false,
        };
        report.consistent = report.mismatches().is_empty();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::{InvariantEnforcer, Posting};
    use crate::ledger::{ReferenceCode, TransactionType};
    use crate::wallet::BankInfo;
    use chrono::Utc;
    use coffer_shared::types::{OwnerId, WithdrawalId};

    fn bank() -> BankInfo {
        BankInfo::new("VCB", "0123456789", "SHOP A")
    }

    fn request(
        wallet: &WalletAccount,
        id: WithdrawalId,
        amount: u64,
        status: WithdrawalStatus,
    ) -> WithdrawalRequest {
        WithdrawalRequest {
            id,
            wallet_id: wallet.id,
            owner_id: wallet.owner_id,
            amount: Money::new(amount),
            bank: bank(),
            note: None,
            admin_note: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            processed_at: None,
        }
    }

    fn commit(wallet: &mut WalletAccount, entries: &mut Vec<WalletTransaction>, posting: &Posting) {
        let plan = InvariantEnforcer::check(wallet, posting, Utc::now()).unwrap();
        *wallet = plan.wallet;
        entries.extend(plan.entry);
    }

    #[test]
    fn test_audit_consistent_after_withdrawal_cycle() {
        let mut wallet = WalletAccount::open(OwnerId::new(), bank(), Utc::now()).unwrap();
        let mut entries = Vec::new();
        commit(
            &mut wallet,
            &mut entries,
            &Posting::credit(
                TransactionType::OrderPayment,
                Money::new(200_000),
                ReferenceCode::external("ORD-1").unwrap(),
                "",
            ),
        );

        let reserve = |amount: u64, id: WithdrawalId| {
            Posting::reserve(Money::new(amount), ReferenceCode::withdrawal(id), "")
        };
        let release = |amount: u64, id: WithdrawalId| {
            Posting::release(Money::new(amount), ReferenceCode::withdrawal(id), "")
        };
        let settle = |amount: u64, id: WithdrawalId| {
            Posting::settle(Money::new(amount), ReferenceCode::withdrawal(id), "")
        };

        let rejected = WithdrawalId::new();
        commit(&mut wallet, &mut entries, &reserve(100_000, rejected));
        commit(&mut wallet, &mut entries, &release(100_000, rejected));

        let completed = WithdrawalId::new();
        commit(&mut wallet, &mut entries, &reserve(60_000, completed));
        commit(&mut wallet, &mut entries, &settle(60_000, completed));

        let open = WithdrawalId::new();
        commit(&mut wallet, &mut entries, &reserve(50_000, open));

        let withdrawals = vec![
            request(&wallet, rejected, 100_000, WithdrawalStatus::Rejected),
            request(&wallet, completed, 60_000, WithdrawalStatus::Completed),
            request(&wallet, open, 50_000, WithdrawalStatus::Approved),
        ];

        let report = TransactionLedger::audit(&wallet, &entries, &withdrawals).unwrap();
        assert!(report.consistent, "mismatches: {:?}", report.mismatches());
        assert_eq!(report.ledger_balance, Money::new(90_000));
        assert_eq!(report.ledger_total_earned, Money::new(200_000));
        assert_eq!(report.open_withdrawals, Money::new(50_000));
        assert_eq!(report.completed_withdrawals, Money::new(60_000));
        assert_eq!(report.entry_count, 5);
    }

    #[test]
    fn test_audit_reports_drift() {
        let mut wallet = WalletAccount::open(OwnerId::new(), bank(), Utc::now()).unwrap();
        let mut entries = Vec::new();
        commit(
            &mut wallet,
            &mut entries,
            &Posting::credit(
                TransactionType::OrderPayment,
                Money::new(1_000),
                ReferenceCode::external("ORD-1").unwrap(),
                "",
            ),
        );
        wallet.balance = Money::new(900);
        wallet.pending_amount = Money::new(100);

        let report = TransactionLedger::audit(&wallet, &entries, &[]).unwrap();
        assert!(!report.consistent);
        assert_eq!(report.mismatches(), vec!["balance", "pending_amount"]);
    }
}
