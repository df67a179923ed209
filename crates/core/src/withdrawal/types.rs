//! Withdrawal domain types.

use chrono::{DateTime, Utc};
use coffer_shared::types::{Money, OwnerId, WalletId, WithdrawalId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::wallet::BankInfo;

/// Status of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    /// Awaiting review; funds are reserved.
    Pending,
    /// Approved for payout; funds remain reserved.
    Approved,
    /// Refused; funds were returned to the balance.
    Rejected,
    /// Paid out.
    Completed,
}

impl WithdrawalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Returns true while the request still holds reserved funds.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operator action on a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalAction {
    /// PENDING → APPROVED.
    Approve,
    /// APPROVED → COMPLETED.
    Complete,
    /// PENDING|APPROVED → REJECTED.
    Reject,
}

impl WithdrawalAction {
    /// Returns the status this action leads to.
    #[must_use]
    pub fn target(&self) -> WithdrawalStatus {
        match self {
            Self::Approve => WithdrawalStatus::Approved,
            Self::Complete => WithdrawalStatus::Completed,
            Self::Reject => WithdrawalStatus::Rejected,
        }
    }
}

/// A request to move money from a wallet's balance to its bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Request ID.
    pub id: WithdrawalId,
    /// Wallet the funds are reserved on.
    pub wallet_id: WalletId,
    /// Owner of the wallet.
    pub owner_id: OwnerId,
    /// Requested amount.
    pub amount: Money,
    /// Payout destination at request time.
    pub bank: BankInfo,
    /// Note from the owner.
    pub note: Option<String>,
    /// Note from the operator who processed the request.
    pub admin_note: Option<String>,
    /// Current status.
    pub status: WithdrawalStatus,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request last changed.
    pub updated_at: DateTime<Utc>,
    /// When an operator last acted on the request.
    pub processed_at: Option<DateTime<Utc>>,
}
