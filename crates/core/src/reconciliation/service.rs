//! Reconciliation state transitions and settlement postings.

use chrono::{DateTime, Utc};
use coffer_shared::types::{Money, SignedMoney};

use crate::enforcer::Posting;
use crate::error::WalletError;
use crate::ledger::{ReferenceCode, TransactionType};
use crate::reconciliation::types::{CodReconciliation, ReconciliationStatus};

/// Stateless service for the COD reconciliation workflow.
pub struct ReconciliationService;

impl ReconciliationService {
    /// Returns the status that follows `current`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidReconciliationTransition` from DONE.
    pub fn advance(current: ReconciliationStatus) -> Result<ReconciliationStatus, WalletError> {
        match current {
            ReconciliationStatus::Pending => Ok(ReconciliationStatus::Processing),
            ReconciliationStatus::Processing => Ok(ReconciliationStatus::Done),
            ReconciliationStatus::Done => {
                Err(WalletError::InvalidReconciliationTransition { from: current })
            }
        }
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Pending → Processing
    /// - Processing → Done
    #[must_use]
    pub fn is_valid_transition(from: ReconciliationStatus, to: ReconciliationStatus) -> bool {
        matches!(
            (from, to),
            (ReconciliationStatus::Pending, ReconciliationStatus::Processing)
                | (ReconciliationStatus::Processing, ReconciliationStatus::Done)
        )
    }

    /// Returns a copy of `reconciliation` with new totals and the next version.
    ///
    /// # Errors
    ///
    /// - `ReconciliationSettled` once the reconciliation is DONE
    /// - `AmountOverflow` if the difference does not fit a signed amount
    pub fn update_totals(
        reconciliation: &CodReconciliation,
        total_collected: Money,
        total_deposited: Money,
        now: DateTime<Utc>,
    ) -> Result<CodReconciliation, WalletError> {
        if !reconciliation.status.is_editable() {
            return Err(WalletError::ReconciliationSettled(reconciliation.id));
        }
        Ok(CodReconciliation {
            total_collected,
            total_deposited,
            difference: SignedMoney::difference(total_deposited, total_collected)?,
            updated_at: now,
            version: reconciliation.version + 1,
            ..reconciliation.clone()
        })
    }

    /// Amount a correction adds on top of the deposit already credited for the day.
    ///
    /// # Errors
    ///
    /// Returns `DepositReduction` if the correction would take credited cash back.
    pub fn correction_delta(
        already_credited: Money,
        total_deposited: Money,
    ) -> Result<Money, WalletError> {
        total_deposited
            .checked_sub(already_credited)
            .map_err(|_| WalletError::DepositReduction {
                settled: already_credited,
                corrected: total_deposited,
            })
    }

    /// Credit emitted when the reconciliation reaches DONE.
    ///
    /// `already_credited` is the deposit settled by the reconciliation being corrected, zero for
    /// an original row. Returns `None` when nothing is left to credit, which settles without
    /// touching the ledger.
    ///
    /// # Errors
    ///
    /// Returns `DepositReduction` if the deposit is below `already_credited`.
    pub fn settlement_posting(
        reconciliation: &CodReconciliation,
        already_credited: Money,
    ) -> Result<Option<Posting>, WalletError> {
        let amount = Self::correction_delta(already_credited, reconciliation.total_deposited)?;
        if amount.is_zero() {
            return Ok(None);
        }
        let description = if reconciliation.is_correction() {
            format!("COD correction for {}", reconciliation.date)
        } else {
            format!("COD reconciliation for {}", reconciliation.date)
        };
        Ok(Some(Posting::credit(
            TransactionType::Adjustment,
            amount,
            ReferenceCode::reconciliation(reconciliation.id),
            description,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::PostingKind;
    use chrono::NaiveDate;
    use coffer_shared::types::OwnerId;

    fn reconciliation(collected: u64, deposited: u64) -> CodReconciliation {
        CodReconciliation::new(
            OwnerId::new(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            Money::new(collected),
            Money::new(deposited),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_advance_path() {
        let processing = ReconciliationService::advance(ReconciliationStatus::Pending).unwrap();
        assert_eq!(processing, ReconciliationStatus::Processing);
        let done = ReconciliationService::advance(processing).unwrap();
        assert_eq!(done, ReconciliationStatus::Done);
        assert!(matches!(
            ReconciliationService::advance(done),
            Err(WalletError::InvalidReconciliationTransition {
                from: ReconciliationStatus::Done
            })
        ));
    }

    #[test]
    fn test_is_valid_transition() {
        assert!(ReconciliationService::is_valid_transition(
            ReconciliationStatus::Pending,
            ReconciliationStatus::Processing
        ));
        assert!(!ReconciliationService::is_valid_transition(
            ReconciliationStatus::Pending,
            ReconciliationStatus::Done
        ));
        assert!(!ReconciliationService::is_valid_transition(
            ReconciliationStatus::Done,
            ReconciliationStatus::Pending
        ));
    }

    #[test]
    fn test_update_totals_recomputes_difference() {
        let rec = reconciliation(500_000, 480_000);
        let updated = ReconciliationService::update_totals(
            &rec,
            Money::new(500_000),
            Money::new(520_000),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(updated.difference, SignedMoney::new(20_000));
        assert_eq!(updated.id, rec.id);
        assert_eq!(updated.status, rec.status);
        assert_eq!(updated.version, rec.version + 1);
    }

    #[test]
    fn test_update_totals_after_done_fails() {
        let mut rec = reconciliation(500_000, 480_000);
        rec.status = ReconciliationStatus::Done;
        assert!(matches!(
            ReconciliationService::update_totals(&rec, Money::ZERO, Money::ZERO, Utc::now()),
            Err(WalletError::ReconciliationSettled(id)) if id == rec.id
        ));
    }

    #[test]
    fn test_settlement_posting_credits_deposit() {
        let rec = reconciliation(500_000, 480_000);
        let posting = ReconciliationService::settlement_posting(&rec, Money::ZERO)
            .unwrap()
            .unwrap();
        assert!(matches!(
            posting.kind,
            PostingKind::Credit { transaction_type: TransactionType::Adjustment, amount }
                if amount == Money::new(480_000)
        ));
        assert_eq!(posting.reference_code, ReferenceCode::reconciliation(rec.id));
    }

    #[test]
    fn test_zero_deposit_has_no_posting() {
        assert!(
            ReconciliationService::settlement_posting(&reconciliation(500_000, 0), Money::ZERO)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_correction_posting_credits_only_the_delta() {
        let mut settled = reconciliation(500_000, 480_000);
        settled.status = ReconciliationStatus::Done;
        let correction = CodReconciliation::correction(
            &settled,
            Money::new(500_000),
            Money::new(500_000),
            Utc::now(),
        )
        .unwrap();

        let posting = ReconciliationService::settlement_posting(&correction, Money::new(480_000))
            .unwrap()
            .unwrap();
        assert_eq!(posting.amount(), Money::new(20_000));
        assert_eq!(
            posting.reference_code,
            ReferenceCode::reconciliation(correction.id)
        );
    }

    #[test]
    fn test_correction_cannot_lower_deposit() {
        assert!(matches!(
            ReconciliationService::correction_delta(Money::new(480_000), Money::new(470_000)),
            Err(WalletError::DepositReduction { settled, corrected })
                if settled == Money::new(480_000) && corrected == Money::new(470_000)
        ));
        assert_eq!(
            ReconciliationService::correction_delta(Money::new(480_000), Money::new(480_000))
                .unwrap(),
            Money::ZERO
        );
    }
}
