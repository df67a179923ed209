//! Reconciliation domain types.

use chrono::{DateTime, NaiveDate, Utc};
use coffer_shared::types::{
    Money, OwnerId, ReconciliationId, SignedMoney, UnlinkedCreditId, WalletTransactionId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WalletError;

/// Status of a COD reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    /// Recorded, not yet reviewed.
    Pending,
    /// Under review.
    Processing,
    /// Settled; the deposit has been credited. Immutable.
    Done,
}

impl ReconciliationStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Done => "DONE",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }

    /// Returns true if the totals may still change.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        !matches!(self, Self::Done)
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One shipper's COD reconciliation for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodReconciliation {
    /// Reconciliation ID.
    pub id: ReconciliationId,
    /// The shipper.
    pub shipper_id: OwnerId,
    /// The reconciled day.
    pub date: NaiveDate,
    /// Current status.
    pub status: ReconciliationStatus,
    /// Settled reconciliation this row corrects, if any.
    pub corrects: Option<ReconciliationId>,
    /// Cash collected from customers.
    pub total_collected: Money,
    /// Cash deposited by the shipper.
    pub total_deposited: Money,
    /// `total_deposited - total_collected`.
    pub difference: SignedMoney,
    /// Ledger entry written when the reconciliation settled into an existing wallet.
    pub settlement_transaction_id: Option<WalletTransactionId>,
    /// Register row written when the shipper had no wallet at settlement.
    pub unlinked_credit_id: Option<UnlinkedCreditId>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
    /// When the reconciliation reached DONE.
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic lock counter, bumped by every write.
    pub version: i64,
}

impl CodReconciliation {
    /// Creates a PENDING reconciliation.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if the difference does not fit a signed amount.
    pub fn new(
        shipper_id: OwnerId,
        date: NaiveDate,
        total_collected: Money,
        total_deposited: Money,
        now: DateTime<Utc>,
    ) -> Result<Self, WalletError> {
        Ok(Self {
            id: ReconciliationId::new(),
            shipper_id,
            date,
            status: ReconciliationStatus::Pending,
            corrects: None,
            total_collected,
            total_deposited,
            difference: SignedMoney::difference(total_deposited, total_collected)?,
            settlement_transaction_id: None,
            unlinked_credit_id: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: 1,
        })
    }

    /// Creates a PENDING correction of a settled reconciliation for the same shipper and day.
    ///
    /// # Errors
    ///
    /// - `ReconciliationNotSettled` unless `settled` is DONE
    /// - `AmountOverflow` if the difference does not fit a signed amount
    pub fn correction(
        settled: &Self,
        total_collected: Money,
        total_deposited: Money,
        now: DateTime<Utc>,
    ) -> Result<Self, WalletError> {
        if settled.status != ReconciliationStatus::Done {
            return Err(WalletError::ReconciliationNotSettled(settled.id));
        }
        Ok(Self {
            corrects: Some(settled.id),
            ..Self::new(
                settled.shipper_id,
                settled.date,
                total_collected,
                total_deposited,
                now,
            )?
        })
    }

    /// Returns true if the row corrects an earlier settled reconciliation.
    #[must_use]
    pub fn is_correction(&self) -> bool {
        self.corrects.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computes_difference() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rec = CodReconciliation::new(
            OwnerId::new(),
            date,
            Money::new(500_000),
            Money::new(480_000),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(rec.status, ReconciliationStatus::Pending);
        assert_eq!(rec.difference, SignedMoney::new(-20_000));
        assert!(rec.completed_at.is_none());
        assert_eq!(rec.version, 1);
        assert!(!rec.is_correction());
    }

    #[test]
    fn test_correction_requires_settled_row() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut rec = CodReconciliation::new(
            OwnerId::new(),
            date,
            Money::new(500_000),
            Money::new(480_000),
            Utc::now(),
        )
        .unwrap();
        let (collected, deposited) = (Money::new(500_000), Money::new(500_000));
        assert!(matches!(
            CodReconciliation::correction(&rec, collected, deposited, Utc::now()),
            Err(WalletError::ReconciliationNotSettled(id)) if id == rec.id
        ));

        rec.status = ReconciliationStatus::Done;
        let correction =
            CodReconciliation::correction(&rec, collected, deposited, Utc::now()).unwrap();
        assert_eq!(correction.corrects, Some(rec.id));
        assert_eq!(correction.shipper_id, rec.shipper_id);
        assert_eq!(correction.date, rec.date);
        assert_eq!(correction.status, ReconciliationStatus::Pending);
        assert_eq!(correction.difference, SignedMoney::ZERO);
        assert_ne!(correction.id, rec.id);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            ReconciliationStatus::parse("processing"),
            Some(ReconciliationStatus::Processing)
        );
        assert_eq!(ReconciliationStatus::parse("DONE"), Some(ReconciliationStatus::Done));
        assert_eq!(ReconciliationStatus::parse("closed"), None);
        assert!(!ReconciliationStatus::Done.is_editable());
        assert!(ReconciliationStatus::Processing.is_editable());
    }
}
