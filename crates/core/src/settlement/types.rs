//! Settlement domain types.

use chrono::{DateTime, Utc};
use coffer_shared::types::{Money, OwnerId, UnlinkedCreditId, WalletTransactionId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enforcer::Posting;
use crate::ledger::{ReferenceCode, TransactionType, WalletTransaction};

/// What produced an unlinked credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditSource {
    /// A delivered order's payment.
    OrderPayment,
    /// A settled COD reconciliation.
    Reconciliation,
}

impl CreditSource {
    /// Returns the string representation of the source.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPayment => "ORDER_PAYMENT",
            Self::Reconciliation => "RECONCILIATION",
        }
    }

    /// Parses a source from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ORDER_PAYMENT" => Some(Self::OrderPayment),
            "RECONCILIATION" => Some(Self::Reconciliation),
            _ => None,
        }
    }
}

impl fmt::Display for CreditSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A credit recorded for an owner who had no wallet when it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlinkedCredit {
    /// Register row ID.
    pub id: UnlinkedCreditId,
    /// Intended recipient.
    pub owner_id: OwnerId,
    /// Ledger type the credit will be written with.
    pub transaction_type: TransactionType,
    /// Amount to credit.
    pub amount: Money,
    /// Reference of the causing event.
    pub reference_code: ReferenceCode,
    /// Description for the eventual ledger entry.
    pub description: String,
    /// What produced the credit.
    pub source: CreditSource,
    /// When the credit was recorded.
    pub created_at: DateTime<Utc>,
    /// When an operator applied it.
    pub linked_at: Option<DateTime<Utc>>,
    /// Ledger entry it was applied as.
    pub linked_transaction_id: Option<WalletTransactionId>,
}

impl UnlinkedCredit {
    /// Records a new, not yet linked credit.
    #[must_use]
    pub fn record(
        owner_id: OwnerId,
        transaction_type: TransactionType,
        amount: Money,
        reference_code: ReferenceCode,
        description: impl Into<String>,
        source: CreditSource,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UnlinkedCreditId::new(),
            owner_id,
            transaction_type,
            amount,
            reference_code,
            description: description.into(),
            source,
            created_at: now,
            linked_at: None,
            linked_transaction_id: None,
        }
    }

    /// Returns true once the credit has been applied to a wallet.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.linked_transaction_id.is_some()
    }

    /// The credit posting that applies this row to a wallet.
    #[must_use]
    pub fn posting(&self) -> Posting {
        Posting::credit(
            self.transaction_type,
            self.amount,
            self.reference_code.clone(),
            self.description.clone(),
        )
    }
}

/// Result of delivering a credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// A new ledger entry was committed.
    Applied(WalletTransaction),
    /// The same credit had already been committed; nothing changed.
    AlreadyApplied(WalletTransaction),
    /// The owner has no wallet; the credit sits in the register.
    Unlinked(UnlinkedCredit),
}

impl SettlementOutcome {
    /// Returns the ledger entry, if the credit reached a wallet.
    #[must_use]
    pub fn entry(&self) -> Option<&WalletTransaction> {
        match self {
            Self::Applied(entry) | Self::AlreadyApplied(entry) => Some(entry),
            Self::Unlinked(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::PostingKind;

    #[test]
    fn test_record_is_unlinked() {
        let credit = UnlinkedCredit::record(
            OwnerId::new(),
            TransactionType::OrderPayment,
            Money::new(150_000),
            ReferenceCode::external("ORD-9").unwrap(),
            "Order ORD-9",
            CreditSource::OrderPayment,
            Utc::now(),
        );
        assert!(!credit.is_linked());
        assert!(matches!(
            credit.posting().kind,
            PostingKind::Credit { transaction_type: TransactionType::OrderPayment, amount }
                if amount == Money::new(150_000)
        ));
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let credit = UnlinkedCredit::record(
            OwnerId::new(),
            TransactionType::Adjustment,
            Money::new(1),
            ReferenceCode::external("ADJ-1").unwrap(),
            "",
            CreditSource::Reconciliation,
            Utc::now(),
        );
        let json = serde_json::to_value(SettlementOutcome::Unlinked(credit)).unwrap();
        assert_eq!(json["outcome"], "unlinked");
        assert_eq!(json["data"]["source"], "RECONCILIATION");
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(CreditSource::parse("order_payment"), Some(CreditSource::OrderPayment));
        assert_eq!(CreditSource::parse("RECONCILIATION"), Some(CreditSource::Reconciliation));
        assert_eq!(CreditSource::parse("REFUND"), None);
    }
}
