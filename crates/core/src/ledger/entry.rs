//! Ledger entry domain types.

use chrono::{DateTime, Utc};
use coffer_shared::types::{
    Money, ReconciliationId, SignedMoney, WalletId, WalletTransactionId, WithdrawalId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::WalletError;

/// Prefix of reference codes generated for withdrawal requests.
pub const WITHDRAWAL_PREFIX: &str = "WDR-";

/// Prefix of reference codes generated for COD reconciliations.
pub const RECONCILIATION_PREFIX: &str = "COD-";

/// Kind of balance-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Proceeds of a delivered order.
    OrderPayment,
    /// Funds reserved by a withdrawal request.
    Withdrawal,
    /// Refund credited back to the owner.
    Refund,
    /// Operator correction, reconciliation settlement or withdrawal release.
    Adjustment,
}

impl TransactionType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPayment => "ORDER_PAYMENT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Refund => "REFUND",
            Self::Adjustment => "ADJUSTMENT",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ORDER_PAYMENT" => Some(Self::OrderPayment),
            "WITHDRAWAL" => Some(Self::Withdrawal),
            "REFUND" => Some(Self::Refund),
            "ADJUSTMENT" => Some(Self::Adjustment),
            _ => None,
        }
    }

    /// Returns true if entries of this type move money out of the balance.
    #[must_use]
    pub fn is_debit(&self) -> bool {
        matches!(self, Self::Withdrawal)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Correlates a ledger entry with the event that caused it.
///
/// Together with the wallet and the transaction type it forms the idempotency key of an entry.
/// Deserialized codes go through [`ReferenceCode::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ReferenceCode(String);

impl ReferenceCode {
    /// Longest accepted reference code, in characters.
    pub const MAX_LEN: usize = 128;

    /// Validates a caller-supplied code such as an order id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidReference` if the code is blank, longer than `MAX_LEN`, or starts with a
    /// prefix reserved for generated codes.
    pub fn external(code: impl Into<String>) -> Result<Self, WalletError> {
        let code = code.into().trim().to_string();
        if code.is_empty() {
            return Err(WalletError::InvalidReference(
                "reference code is required".to_string(),
            ));
        }
        if code.chars().count() > Self::MAX_LEN {
            return Err(WalletError::InvalidReference(format!(
                "reference code exceeds {} characters",
                Self::MAX_LEN
            )));
        }
        let upper = code.to_ascii_uppercase();
        if upper.starts_with(WITHDRAWAL_PREFIX) || upper.starts_with(RECONCILIATION_PREFIX) {
            return Err(WalletError::InvalidReference(format!(
                "prefix of {code} is reserved"
            )));
        }
        Ok(Self(code))
    }

    /// Accepts a well-formed generated code (`WDR-<uuid>` or `COD-<uuid>`) as is, and validates
    /// anything else as an external code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidReference` under the same rules as [`ReferenceCode::external`].
    pub fn parse(code: impl Into<String>) -> Result<Self, WalletError> {
        let code = code.into();
        let generated = [WITHDRAWAL_PREFIX, RECONCILIATION_PREFIX]
            .iter()
            .filter_map(|prefix| code.strip_prefix(prefix))
            .any(|id| Uuid::parse_str(id).is_ok());
        if generated {
            return Ok(Self(code));
        }
        Self::external(code)
    }

    /// Code for entries caused by a withdrawal request.
    #[must_use]
    pub fn withdrawal(id: WithdrawalId) -> Self {
        Self(format!("{WITHDRAWAL_PREFIX}{id}"))
    }

    /// Code for entries caused by a COD reconciliation.
    #[must_use]
    pub fn reconciliation(id: ReconciliationId) -> Self {
        Self(format!("{RECONCILIATION_PREFIX}{id}"))
    }

    /// Wraps a code read back from storage without validation.
    #[must_use]
    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the code was generated for a withdrawal request.
    #[must_use]
    pub fn is_withdrawal(&self) -> bool {
        self.0.starts_with(WITHDRAWAL_PREFIX)
    }

    /// Returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ReferenceCode {
    type Error = WalletError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::parse(code)
    }
}

impl From<ReferenceCode> for String {
    fn from(code: ReferenceCode) -> Self {
        code.0
    }
}

impl fmt::Display for ReferenceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable, committed ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    /// Entry ID.
    pub id: WalletTransactionId,
    /// Wallet the entry belongs to.
    pub wallet_id: WalletId,
    /// Position in the wallet's ledger, starting at 1.
    pub sequence: i64,
    /// Kind of event.
    pub transaction_type: TransactionType,
    /// Signed effect on the balance.
    pub amount: SignedMoney,
    /// Balance before the entry.
    pub balance_before: Money,
    /// Balance after the entry.
    pub balance_after: Money,
    /// Human readable description.
    pub description: String,
    /// Causing event.
    pub reference_code: ReferenceCode,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// Returns true if `balance_after == balance_before + amount`.
    #[must_use]
    pub fn arithmetic_holds(&self) -> bool {
        self.amount
            .apply_to(self.balance_before)
            .is_ok_and(|after| after == self.balance_after)
    }

    /// Returns true if the entry is the compensating credit of a rejected withdrawal.
    #[must_use]
    pub fn is_withdrawal_release(&self) -> bool {
        self.transaction_type == TransactionType::Adjustment && self.reference_code.is_withdrawal()
    }
}
