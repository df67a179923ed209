//! Wallet account and payout metadata.

use chrono::{DateTime, Utc};
use coffer_shared::types::{Money, OwnerId, WalletId};
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Bank payout details attached to a wallet or snapshotted onto a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankInfo {
    /// Name of the receiving bank.
    pub bank_name: String,
    /// Account number at the bank.
    pub bank_account_number: String,
    /// Name of the account holder.
    pub bank_account_name: String,
}

impl BankInfo {
    /// Creates bank info with surrounding whitespace trimmed.
    #[must_use]
    pub fn new(
        bank_name: impl Into<String>,
        bank_account_number: impl Into<String>,
        bank_account_name: impl Into<String>,
    ) -> Self {
        Self {
            bank_name: bank_name.into().trim().to_string(),
            bank_account_number: bank_account_number.into().trim().to_string(),
            bank_account_name: bank_account_name.into().trim().to_string(),
        }
    }

    /// Checks that every field is present.
    ///
    /// # Errors
    ///
    /// Returns `MissingBankInfo` naming the first blank field.
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.bank_name.trim().is_empty() {
            return Err(WalletError::MissingBankInfo("bank_name"));
        }
        if self.bank_account_number.trim().is_empty() {
            return Err(WalletError::MissingBankInfo("bank_account_number"));
        }
        if self.bank_account_name.trim().is_empty() {
            return Err(WalletError::MissingBankInfo("bank_account_name"));
        }
        Ok(())
    }
}

/// A wallet held by a shop or a shipper.
///
/// Balances are a projection of the wallet's ledger and always satisfy
/// `balance + pending_amount + total_withdrawn == total_earned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
    /// Wallet ID.
    pub id: WalletId,
    /// Owning shop or shipper.
    pub owner_id: OwnerId,
    /// Payout destination.
    pub bank: BankInfo,
    /// Inactive wallets still receive credits but refuse withdrawals.
    pub is_active: bool,
    /// Withdrawable balance.
    pub balance: Money,
    /// Amount reserved by open withdrawal requests.
    pub pending_amount: Money,
    /// Lifetime credits.
    pub total_earned: Money,
    /// Lifetime completed withdrawals.
    pub total_withdrawn: Money,
    /// Optimistic concurrency version, bumped on every monetary commit.
    pub version: i64,
    /// Sequence number of the latest ledger entry (0 when the ledger is empty).
    pub last_sequence: i64,
    /// When the wallet was created.
    pub created_at: DateTime<Utc>,
    /// When the wallet last changed.
    pub updated_at: DateTime<Utc>,
}

impl WalletAccount {
    /// Opens an empty wallet for an owner.
    ///
    /// # Errors
    ///
    /// Returns `MissingBankInfo` if any bank field is blank.
    pub fn open(
        owner_id: OwnerId,
        bank: BankInfo,
        now: DateTime<Utc>,
    ) -> Result<Self, WalletError> {
        bank.validate()?;
        Ok(Self {
            id: WalletId::new(),
            owner_id,
            bank,
            is_active: true,
            balance: Money::ZERO,
            pending_amount: Money::ZERO,
            total_earned: Money::ZERO,
            total_withdrawn: Money::ZERO,
            version: 0,
            last_sequence: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if `balance + pending_amount + total_withdrawn == total_earned`.
    ///
    /// Counters that overflow when summed never satisfy the invariant.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        Money::try_sum([self.balance, self.pending_amount, self.total_withdrawn])
            .is_ok_and(|sum| sum == self.total_earned)
    }
}
