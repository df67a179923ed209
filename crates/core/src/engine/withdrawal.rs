//! Withdrawal requests and their processing.

use chrono::Utc;
use coffer_shared::types::{Money, OwnerId, PageRequest, PageResponse, WithdrawalId};
use serde::Deserialize;

use super::{WalletEngine, is_conflict};
use crate::enforcer::InvariantEnforcer;
use crate::error::WalletError;
use crate::store::{LedgerCommit, WalletWrite, WithdrawalWrite};
use crate::wallet::BankInfo;
use crate::withdrawal::{WithdrawalAction, WithdrawalRequest, WithdrawalService, WithdrawalStatus};

/// Owner input for a withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewWithdrawal {
    /// Amount to withdraw.
    pub amount: Money,
    /// Payout destination; the wallet's bank info when absent.
    #[serde(default)]
    pub bank: Option<BankInfo>,
    /// Free-form note.
    #[serde(default)]
    pub note: Option<String>,
}

impl WalletEngine {
    /// Reserves funds for a new withdrawal request.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound` if the owner has no wallet
    /// - `WalletInactive` if the wallet is locked
    /// - `BelowMinimumWithdrawal` if the amount is under the configured minimum
    /// - `InsufficientBalance` if the amount exceeds the balance
    /// - `MissingBankInfo` if the payout destination is incomplete
    pub async fn request_withdrawal(
        &self,
        owner_id: OwnerId,
        input: NewWithdrawal,
    ) -> Result<WithdrawalRequest, WalletError> {
        let wallet = self.require_wallet(owner_id).await?;
        let _guard = self.lock(wallet.id.into_inner()).await;

        for attempt in self.attempts() {
            let wallet = self.load_wallet(wallet.id).await?;
            WithdrawalService::validate_request(&wallet, input.amount, self.config.min_withdrawal)?;

            let bank = match &input.bank {
                Some(bank) => BankInfo::new(
                    bank.bank_name.as_str(),
                    bank.bank_account_number.as_str(),
                    bank.bank_account_name.as_str(),
                ),
                None => wallet.bank.clone(),
            };
            bank.validate()?;

            let now = Utc::now();
            let request = WithdrawalRequest {
                id: WithdrawalId::new(),
                wallet_id: wallet.id,
                owner_id,
                amount: input.amount,
                bank,
                note: input
                    .note
                    .as_deref()
                    .map(str::trim)
                    .filter(|note| !note.is_empty())
                    .map(str::to_string),
                admin_note: None,
                status: WithdrawalStatus::Pending,
                created_at: now,
                updated_at: now,
                processed_at: None,
            };

            let plan =
                InvariantEnforcer::check(&wallet, &WithdrawalService::reservation(&request), now)?;
            let commit = LedgerCommit {
                wallet: Some(WalletWrite {
                    expected_version: wallet.version,
                    wallet: plan.wallet,
                }),
                entry: plan.entry,
                withdrawal: Some(WithdrawalWrite::Insert(request.clone())),
                ..LedgerCommit::default()
            };

            match self.store.commit(commit).await {
                Ok(_) => {
                    tracing::info!(
                        withdrawal_id = %request.id,
                        wallet_id = %request.wallet_id,
                        %owner_id,
                        amount = %request.amount,
                        "Withdrawal requested"
                    );
                    return Ok(request);
                }
                Err(err) if is_conflict(&err) => {
                    Self::note_conflict("request_withdrawal", attempt, &err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("request_withdrawal"))
    }

    /// PENDING → APPROVED. No balance change.
    ///
    /// # Errors
    ///
    /// - `WithdrawalNotFound` if the request does not exist
    /// - `InvalidWithdrawalTransition` unless the request is PENDING
    pub async fn approve_withdrawal(
        &self,
        id: WithdrawalId,
        admin_note: Option<String>,
    ) -> Result<WithdrawalRequest, WalletError> {
        self.process_withdrawal(id, WithdrawalAction::Approve, admin_note)
            .await
    }

    /// APPROVED → COMPLETED. Moves the reservation into `total_withdrawn`.
    ///
    /// # Errors
    ///
    /// - `WithdrawalNotFound` if the request does not exist
    /// - `InvalidWithdrawalTransition` unless the request is APPROVED
    pub async fn complete_withdrawal(
        &self,
        id: WithdrawalId,
        admin_note: Option<String>,
    ) -> Result<WithdrawalRequest, WalletError> {
        self.process_withdrawal(id, WithdrawalAction::Complete, admin_note)
            .await
    }

    /// PENDING|APPROVED → REJECTED. Returns the reservation to the balance with a compensating
    /// ADJUSTMENT entry.
    ///
    /// # Errors
    ///
    /// - `WithdrawalNotFound` if the request does not exist
    /// - `InvalidWithdrawalTransition` if the request is already closed
    pub async fn reject_withdrawal(
        &self,
        id: WithdrawalId,
        admin_note: Option<String>,
    ) -> Result<WithdrawalRequest, WalletError> {
        self.process_withdrawal(id, WithdrawalAction::Reject, admin_note)
            .await
    }

    /// Returns a withdrawal request.
    ///
    /// # Errors
    ///
    /// Returns `WithdrawalNotFound` if it does not exist.
    pub async fn get_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest, WalletError> {
        self.store
            .find_withdrawal(id)
            .await?
            .ok_or(WalletError::WithdrawalNotFound(id))
    }

    /// Operator queue: requests in a status, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    pub async fn withdrawals_by_status(
        &self,
        status: WithdrawalStatus,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, WalletError> {
        Ok(self
            .store
            .list_withdrawals_by_status(status, page.clamped())
            .await?)
    }

    async fn process_withdrawal(
        &self,
        id: WithdrawalId,
        action: WithdrawalAction,
        admin_note: Option<String>,
    ) -> Result<WithdrawalRequest, WalletError> {
        let request = self.get_withdrawal(id).await?;
        let _guard = self.lock(request.wallet_id.into_inner()).await;
        let admin_note = admin_note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());

        for attempt in self.attempts() {
            let current = self.get_withdrawal(id).await?;
            let status = WithdrawalService::transition(current.status, action)?;
            let now = Utc::now();
            let updated = WithdrawalRequest {
                status,
                admin_note: admin_note.clone().or_else(|| current.admin_note.clone()),
                updated_at: now,
                processed_at: Some(now),
                ..current.clone()
            };

            let mut commit = LedgerCommit {
                withdrawal: Some(WithdrawalWrite::Update {
                    request: updated.clone(),
                    expected_status: current.status,
                }),
                ..LedgerCommit::default()
            };
            if let Some(posting) = WithdrawalService::posting_for(action, &current) {
                let wallet = self.load_wallet(current.wallet_id).await?;
                let plan = InvariantEnforcer::check(&wallet, &posting, now)?;
                commit.wallet = Some(WalletWrite {
                    expected_version: wallet.version,
                    wallet: plan.wallet,
                });
                commit.entry = plan.entry;
            }

            match self.store.commit(commit).await {
                Ok(_) => {
                    tracing::info!(
                        withdrawal_id = %id,
                        wallet_id = %updated.wallet_id,
                        from = %current.status,
                        to = %updated.status,
                        amount = %updated.amount,
                        "Withdrawal processed"
                    );
                    return Ok(updated);
                }
                Err(err) if is_conflict(&err) => {
                    Self::note_conflict("process_withdrawal", attempt, &err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("process_withdrawal"))
    }
}
