//! Proposed wallet mutations.

use coffer_shared::types::{Money, MoneyError, SignedMoney};

use crate::ledger::{ReferenceCode, TransactionType, WalletTransaction};
use crate::wallet::WalletAccount;

/// Counter effects of a posting.
///
/// | kind    | balance | pending | earned | withdrawn | ledger entry          |
/// |---------|---------|---------|--------|-----------|-----------------------|
/// | Credit  | +       |         | +      |           | given type, `+amount` |
/// | Reserve | −       | +       |        |           | WITHDRAWAL `-amount`  |
/// | Release | +       | −       |        |           | ADJUSTMENT `+amount`  |
/// | Settle  |         | −       |        | +         | none                  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingKind {
    /// New money for the owner.
    Credit {
        /// Ledger type of the credit.
        transaction_type: TransactionType,
        /// Amount credited.
        amount: Money,
    },
    /// Funds moved from the balance into a withdrawal reservation.
    Reserve {
        /// Amount reserved.
        amount: Money,
    },
    /// Reserved funds returned to the balance.
    Release {
        /// Amount released.
        amount: Money,
    },
    /// Reserved funds paid out.
    Settle {
        /// Amount settled.
        amount: Money,
    },
}

/// A proposed mutation of one wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Counter effects.
    pub kind: PostingKind,
    /// Reference written to the ledger entry, if one is produced.
    pub reference_code: ReferenceCode,
    /// Description written to the ledger entry, if one is produced.
    pub description: String,
}

impl Posting {
    /// Creates a credit posting.
    #[must_use]
    pub fn credit(
        transaction_type: TransactionType,
        amount: Money,
        reference_code: ReferenceCode,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: PostingKind::Credit {
                transaction_type,
                amount,
            },
            reference_code,
            description: description.into(),
        }
    }

    /// Creates a reservation posting.
    #[must_use]
    pub fn reserve(
        amount: Money,
        reference_code: ReferenceCode,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: PostingKind::Reserve { amount },
            reference_code,
            description: description.into(),
        }
    }

    /// Creates a release posting.
    #[must_use]
    pub fn release(
        amount: Money,
        reference_code: ReferenceCode,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: PostingKind::Release { amount },
            reference_code,
            description: description.into(),
        }
    }

    /// Creates a settlement posting.
    #[must_use]
    pub fn settle(
        amount: Money,
        reference_code: ReferenceCode,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: PostingKind::Settle { amount },
            reference_code,
            description: description.into(),
        }
    }

    /// Returns the posted amount.
    #[must_use]
    pub fn amount(&self) -> Money {
        match self.kind {
            PostingKind::Credit { amount, .. }
            | PostingKind::Reserve { amount }
            | PostingKind::Release { amount }
            | PostingKind::Settle { amount } => amount,
        }
    }

    /// Returns the type of ledger entry this posting produces, if any.
    #[must_use]
    pub fn entry_type(&self) -> Option<TransactionType> {
        match self.kind {
            PostingKind::Credit {
                transaction_type, ..
            } => Some(transaction_type),
            PostingKind::Reserve { .. } => Some(TransactionType::Withdrawal),
            PostingKind::Release { .. } => Some(TransactionType::Adjustment),
            PostingKind::Settle { .. } => None,
        }
    }

    /// Returns the signed ledger amount of this posting.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the amount does not fit a signed value.
    pub fn entry_amount(&self) -> Result<SignedMoney, MoneyError> {
        match self.kind {
            PostingKind::Reserve { amount } => amount.as_debit(),
            PostingKind::Credit { amount, .. }
            | PostingKind::Release { amount }
            | PostingKind::Settle { amount } => amount.as_signed(),
        }
    }
}

/// The validated outcome of a posting: the wallet state and entry to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingPlan {
    /// Candidate wallet state. `version` still holds the snapshot's version.
    pub wallet: WalletAccount,
    /// Ledger entry to append, if the posting produces one.
    pub entry: Option<WalletTransaction>,
}
