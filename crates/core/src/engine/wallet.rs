//! Wallet lifecycle and read models.

use chrono::Utc;
use coffer_shared::types::{OwnerId, PageRequest, PageResponse};
use serde::Serialize;

use super::WalletEngine;
use crate::error::WalletError;
use crate::ledger::{AuditReport, TransactionLedger, WalletTransaction};
use crate::store::StoreError;
use crate::wallet::{BankInfo, WalletAccount};
use crate::withdrawal::WithdrawalRequest;

/// A new wallet and the number of register credits waiting for it.
///
/// Waiting credits are not applied automatically; an operator links them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedWallet {
    /// The wallet.
    pub wallet: WalletAccount,
    /// Unlinked credits recorded for the owner before the wallet existed.
    pub pending_unlinked_credits: usize,
}

impl WalletEngine {
    /// Opens the wallet of an owner.
    ///
    /// # Errors
    ///
    /// - `MissingBankInfo` if any bank field is blank
    /// - `WalletAlreadyExists` if the owner has a wallet
    pub async fn create_wallet(
        &self,
        owner_id: OwnerId,
        bank: BankInfo,
    ) -> Result<CreatedWallet, WalletError> {
        let bank = normalize(bank);
        let wallet = WalletAccount::open(owner_id, bank, Utc::now())?;

        match self.store.insert_wallet(&wallet).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(WalletError::WalletAlreadyExists(owner_id)),
            Err(err) => return Err(err.into()),
        }

        let pending_unlinked_credits = self
            .store
            .list_unlinked_credits(owner_id)
            .await?
            .iter()
            .filter(|credit| !credit.is_linked())
            .count();

        tracing::info!(%owner_id, wallet_id = %wallet.id, "Wallet created");
        if pending_unlinked_credits > 0 {
            tracing::warn!(
                %owner_id,
                wallet_id = %wallet.id,
                pending_unlinked_credits,
                "Owner has unlinked credits awaiting operator action"
            );
        }

        Ok(CreatedWallet {
            wallet,
            pending_unlinked_credits,
        })
    }

    /// Returns the wallet of an owner.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if the owner has no wallet.
    pub async fn get_wallet(&self, owner_id: OwnerId) -> Result<WalletAccount, WalletError> {
        self.require_wallet(owner_id).await
    }

    /// Replaces the wallet's payout details.
    ///
    /// Balances and the bank snapshots of existing withdrawal requests are untouched.
    ///
    /// # Errors
    ///
    /// - `MissingBankInfo` if any bank field is blank
    /// - `WalletNotFound` if the owner has no wallet
    pub async fn update_bank_info(
        &self,
        owner_id: OwnerId,
        bank: BankInfo,
    ) -> Result<WalletAccount, WalletError> {
        let bank = normalize(bank);
        bank.validate()?;

        let wallet = self.require_wallet(owner_id).await?;
        let _guard = self.lock(wallet.id.into_inner()).await;
        let current = self.load_wallet(wallet.id).await?;
        let updated = self
            .store
            .update_wallet_metadata(current.id, &bank, current.is_active, Utc::now())
            .await?;

        tracing::info!(%owner_id, wallet_id = %updated.id, "Bank info updated");
        Ok(updated)
    }

    /// Locks or unlocks a wallet for withdrawals. Credits are accepted either way.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if the owner has no wallet.
    pub async fn set_active(
        &self,
        owner_id: OwnerId,
        is_active: bool,
    ) -> Result<WalletAccount, WalletError> {
        let wallet = self.require_wallet(owner_id).await?;
        let _guard = self.lock(wallet.id.into_inner()).await;
        let current = self.load_wallet(wallet.id).await?;
        let updated = self
            .store
            .update_wallet_metadata(current.id, &current.bank, is_active, Utc::now())
            .await?;

        tracing::info!(%owner_id, wallet_id = %updated.id, is_active, "Wallet status changed");
        Ok(updated)
    }

    /// Lists an owner's ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if the owner has no wallet.
    pub async fn transactions(
        &self,
        owner_id: OwnerId,
        page: PageRequest,
    ) -> Result<PageResponse<WalletTransaction>, WalletError> {
        let wallet = self.require_wallet(owner_id).await?;
        Ok(self.store.list_entries(wallet.id, page.clamped()).await?)
    }

    /// Lists an owner's withdrawal requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if the owner has no wallet.
    pub async fn withdrawals(
        &self,
        owner_id: OwnerId,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, WalletError> {
        let wallet = self.require_wallet(owner_id).await?;
        Ok(self.store.list_withdrawals(wallet.id, page.clamped()).await?)
    }

    /// Recomputes an owner's wallet from its ledger and withdrawal rows.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound` if the owner has no wallet
    /// - `CorruptLedger` if the ledger does not replay
    pub async fn audit(&self, owner_id: OwnerId) -> Result<AuditReport, WalletError> {
        let wallet = self.require_wallet(owner_id).await?;
        let _guard = self.lock(wallet.id.into_inner()).await;

        let wallet = self.load_wallet(wallet.id).await?;
        let entries = self.store.all_entries(wallet.id).await?;
        let withdrawals = self.store.all_withdrawals(wallet.id).await?;

        let report = TransactionLedger::audit(&wallet, &entries, &withdrawals).inspect_err(|err| {
            tracing::error!(
                %owner_id,
                wallet_id = %wallet.id,
                error = %err,
                "Ledger replay failed"
            );
        })?;
        if !report.consistent {
            tracing::error!(
                %owner_id,
                wallet_id = %wallet.id,
                mismatches = ?report.mismatches(),
                "Wallet projection disagrees with its ledger"
            );
        }
        Ok(report)
    }
}

fn normalize(bank: BankInfo) -> BankInfo {
    BankInfo::new(
        bank.bank_name,
        bank.bank_account_number,
        bank.bank_account_name,
    )
}
