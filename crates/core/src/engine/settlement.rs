//! Credits from external events and the unlinked-credit register.

use chrono::Utc;
use coffer_shared::types::{Money, OwnerId, UnlinkedCreditId, WalletId};

use super::{WalletEngine, is_conflict};
use crate::enforcer::{InvariantEnforcer, Posting, PostingKind};
use crate::error::WalletError;
use crate::ledger::{ReferenceCode, TransactionType};
use crate::settlement::{CreditSource, SettlementOutcome, UnlinkedCredit};
use crate::store::{LedgerCommit, StoreError, UnlinkedWrite, WalletWrite};

impl WalletEngine {
    /// Credits the proceeds of a delivered order.
    ///
    /// Delivering the same `(owner, reference_code)` again returns the original outcome. An owner
    /// without a wallet gets a register row instead of an error.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount` is zero
    /// - `ConcurrentModification` if commit retries run out
    pub async fn settle_order_payment(
        &self,
        owner_id: OwnerId,
        amount: Money,
        reference_code: ReferenceCode,
        description: String,
    ) -> Result<SettlementOutcome, WalletError> {
        self.deliver_credit(
            owner_id,
            Posting::credit(
                TransactionType::OrderPayment,
                amount,
                reference_code,
                description,
            ),
            Some(CreditSource::OrderPayment),
        )
        .await
    }

    /// Operator credit correction, written as an ADJUSTMENT.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount` is zero
    /// - `WalletNotFound` if the owner has no wallet
    pub async fn credit_adjustment(
        &self,
        owner_id: OwnerId,
        amount: Money,
        reference_code: ReferenceCode,
        description: String,
    ) -> Result<SettlementOutcome, WalletError> {
        self.deliver_credit(
            owner_id,
            Posting::credit(
                TransactionType::Adjustment,
                amount,
                reference_code,
                description,
            ),
            None,
        )
        .await
    }

    /// Lists an owner's register rows, linked ones included, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    pub async fn list_unlinked_credits(
        &self,
        owner_id: OwnerId,
    ) -> Result<Vec<UnlinkedCredit>, WalletError> {
        Ok(self.store.list_unlinked_credits(owner_id).await?)
    }

    /// Applies a register row to its owner's wallet, exactly once.
    ///
    /// Linking an already linked row returns the entry it was applied as.
    ///
    /// # Errors
    ///
    /// - `UnlinkedCreditNotFound` if the row does not exist
    /// - `WalletNotFound` if the owner still has no wallet
    pub async fn link_unlinked_credit(
        &self,
        id: UnlinkedCreditId,
    ) -> Result<SettlementOutcome, WalletError> {
        let credit = self.load_unlinked(id).await?;
        if credit.is_linked() {
            return self.registered_outcome(credit).await;
        }

        let wallet = self.require_wallet(credit.owner_id).await?;
        let _guard = self.lock(wallet.id.into_inner()).await;

        let credit = self.load_unlinked(id).await?;
        if credit.is_linked() {
            return self.registered_outcome(credit).await;
        }

        let outcome = self
            .apply_credit(wallet.id, &credit.posting(), Some(credit.id))
            .await?;
        tracing::info!(
            unlinked_credit_id = %credit.id,
            owner_id = %credit.owner_id,
            wallet_id = %wallet.id,
            amount = %credit.amount,
            "Unlinked credit applied"
        );
        Ok(outcome)
    }

    async fn deliver_credit(
        &self,
        owner_id: OwnerId,
        posting: Posting,
        register_as: Option<CreditSource>,
    ) -> Result<SettlementOutcome, WalletError> {
        if posting.amount().is_zero() {
            return Err(WalletError::InvalidAmount);
        }
        let transaction_type = credit_type(&posting)?;

        // A trigger parked in the register stays there until an operator links it.
        if let Some(existing) = self
            .store
            .find_unlinked_by_reference(owner_id, transaction_type, &posting.reference_code)
            .await?
        {
            return self.registered_outcome(existing).await;
        }

        let Some(wallet) = self.store.find_wallet_by_owner(owner_id).await? else {
            let Some(source) = register_as else {
                return Err(WalletError::WalletNotFound(owner_id));
            };
            let credit = UnlinkedCredit::record(
                owner_id,
                transaction_type,
                posting.amount(),
                posting.reference_code,
                posting.description,
                source,
                Utc::now(),
            );
            return self
                .register_unlinked(credit)
                .await
                .map(SettlementOutcome::Unlinked);
        };

        let _guard = self.lock(wallet.id.into_inner()).await;
        self.apply_credit(wallet.id, &posting, None).await
    }

    /// Commits a credit to a wallet whose lock the caller holds.
    ///
    /// With `link`, the register row is marked as applied in the same commit.
    async fn apply_credit(
        &self,
        wallet_id: WalletId,
        posting: &Posting,
        link: Option<UnlinkedCreditId>,
    ) -> Result<SettlementOutcome, WalletError> {
        let transaction_type = credit_type(posting)?;

        for attempt in self.attempts() {
            if let Some(existing) = self
                .store
                .find_entry(wallet_id, transaction_type, &posting.reference_code)
                .await?
            {
                if let Some(id) = link {
                    self.store
                        .commit(LedgerCommit {
                            unlinked: Some(UnlinkedWrite::Link {
                                id,
                                transaction_id: existing.id,
                                linked_at: Utc::now(),
                            }),
                            ..LedgerCommit::default()
                        })
                        .await?;
                }
                tracing::debug!(
                    %wallet_id,
                    reference_code = %posting.reference_code,
                    "Credit already applied"
                );
                return Ok(SettlementOutcome::AlreadyApplied(existing));
            }

            let wallet = self.load_wallet(wallet_id).await?;
            let plan = InvariantEnforcer::check(&wallet, posting, Utc::now())?;
            let entry = plan.entry.clone().ok_or_else(|| {
                WalletError::InvariantViolation("credit planned without a ledger entry".to_string())
            })?;
            let commit = LedgerCommit {
                wallet: Some(WalletWrite {
                    expected_version: wallet.version,
                    wallet: plan.wallet,
                }),
                entry: Some(entry.clone()),
                unlinked: link.map(|id| UnlinkedWrite::Link {
                    id,
                    transaction_id: entry.id,
                    linked_at: entry.created_at,
                }),
                ..LedgerCommit::default()
            };

            match self.store.commit(commit).await {
                Ok(_) => {
                    tracing::info!(
                        %wallet_id,
                        transaction_id = %entry.id,
                        transaction_type = %entry.transaction_type,
                        amount = %entry.amount,
                        balance_after = %entry.balance_after,
                        sequence = entry.sequence,
                        reference_code = %entry.reference_code,
                        "Credit committed"
                    );
                    return Ok(SettlementOutcome::Applied(entry));
                }
                Err(StoreError::DuplicateReference(_)) => {
                    if let Some(existing) = self
                        .store
                        .find_entry(wallet_id, transaction_type, &posting.reference_code)
                        .await?
                    {
                        return Ok(SettlementOutcome::AlreadyApplied(existing));
                    }
                }
                Err(err) if is_conflict(&err) => Self::note_conflict("apply_credit", attempt, &err),
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("apply_credit"))
    }

    async fn register_unlinked(
        &self,
        credit: UnlinkedCredit,
    ) -> Result<UnlinkedCredit, WalletError> {
        let commit = LedgerCommit {
            unlinked: Some(UnlinkedWrite::Insert(credit.clone())),
            ..LedgerCommit::default()
        };
        match self.store.commit(commit).await {
            Ok(_) => {
                tracing::warn!(
                    owner_id = %credit.owner_id,
                    unlinked_credit_id = %credit.id,
                    amount = %credit.amount,
                    reference_code = %credit.reference_code,
                    source = %credit.source,
                    "Owner has no wallet, credit recorded as unlinked"
                );
                Ok(credit)
            }
            Err(StoreError::Duplicate(_)) => self
                .store
                .find_unlinked_by_reference(
                    credit.owner_id,
                    credit.transaction_type,
                    &credit.reference_code,
                )
                .await?
                .ok_or_else(|| {
                    WalletError::Storage(format!(
                        "unlinked credit {} reported duplicate but not found",
                        credit.reference_code
                    ))
                }),
            Err(err) => Err(err.into()),
        }
    }

    /// Outcome of a trigger that is already in the register.
    async fn registered_outcome(
        &self,
        credit: UnlinkedCredit,
    ) -> Result<SettlementOutcome, WalletError> {
        let Some(transaction_id) = credit.linked_transaction_id else {
            return Ok(SettlementOutcome::Unlinked(credit));
        };
        let entry = self
            .store
            .find_entry_by_id(transaction_id)
            .await?
            .ok_or_else(|| {
                WalletError::InvariantViolation(format!(
                    "entry {transaction_id} of linked credit {} is missing",
                    credit.id
                ))
            })?;
        Ok(SettlementOutcome::AlreadyApplied(entry))
    }

    async fn load_unlinked(&self, id: UnlinkedCreditId) -> Result<UnlinkedCredit, WalletError> {
        self.store
            .find_unlinked_credit(id)
            .await?
            .ok_or(WalletError::UnlinkedCreditNotFound(id))
    }
}

fn credit_type(posting: &Posting) -> Result<TransactionType, WalletError> {
    match posting.kind {
        PostingKind::Credit {
            transaction_type, ..
        } => Ok(transaction_type),
        _ => Err(WalletError::InvariantViolation(
            "settlement posting is not a credit".to_string(),
        )),
    }
}
