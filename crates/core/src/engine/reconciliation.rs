//! COD reconciliation workflow.

use chrono::{NaiveDate, Utc};
use coffer_shared::types::{Money, OwnerId, PageRequest, PageResponse, ReconciliationId};

use super::{WalletEngine, is_conflict};
use crate::enforcer::{InvariantEnforcer, PostingKind};
use crate::error::WalletError;
use crate::reconciliation::{CodReconciliation, ReconciliationService, ReconciliationStatus};
use crate::settlement::{CreditSource, UnlinkedCredit};
use crate::store::{LedgerCommit, ReconciliationWrite, StoreError, UnlinkedWrite, WalletWrite};

impl WalletEngine {
    /// Records a PENDING reconciliation for one shipper and day.
    ///
    /// # Errors
    ///
    /// - `DuplicateReconciliation` if the day is already recorded for the shipper
    /// - `AmountOverflow` if the difference does not fit
    pub async fn create_reconciliation(
        &self,
        shipper_id: OwnerId,
        date: NaiveDate,
        total_collected: Money,
        total_deposited: Money,
    ) -> Result<CodReconciliation, WalletError> {
        let reconciliation = CodReconciliation::new(
            shipper_id,
            date,
            total_collected,
            total_deposited,
            Utc::now(),
        )?;

        match self.store.insert_reconciliation(&reconciliation).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(WalletError::DuplicateReconciliation { shipper_id, date });
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(
            reconciliation_id = %reconciliation.id,
            %shipper_id,
            %date,
            collected = %total_collected,
            deposited = %total_deposited,
            difference = %reconciliation.difference,
            "Reconciliation created"
        );
        Ok(reconciliation)
    }

    /// Opens a PENDING correction of a settled reconciliation.
    ///
    /// The settled row stays untouched; the correction carries the full corrected figures for
    /// the same shipper and day and settles the extra deposit when it reaches DONE.
    ///
    /// # Errors
    ///
    /// - `ReconciliationNotFound` if `id` does not exist
    /// - `ReconciliationNotSettled` unless `id` is DONE
    /// - `ReconciliationAlreadyCorrected` if `id` already has a correction
    /// - `DepositReduction` if the corrected deposit is below the settled one
    pub async fn correct_reconciliation(
        &self,
        id: ReconciliationId,
        total_collected: Money,
        total_deposited: Money,
    ) -> Result<CodReconciliation, WalletError> {
        let _guard = self.lock(id.into_inner()).await;
        let settled = self.get_reconciliation(id).await?;
        let correction =
            CodReconciliation::correction(&settled, total_collected, total_deposited, Utc::now())?;
        let extra =
            ReconciliationService::correction_delta(settled.total_deposited, total_deposited)?;

        match self.store.insert_reconciliation(&correction).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(WalletError::ReconciliationAlreadyCorrected(id));
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(
            reconciliation_id = %correction.id,
            corrects = %id,
            shipper_id = %correction.shipper_id,
            date = %correction.date,
            deposited = %total_deposited,
            extra_deposit = %extra,
            "Reconciliation correction created"
        );
        Ok(correction)
    }

    /// Returns a reconciliation.
    ///
    /// # Errors
    ///
    /// Returns `ReconciliationNotFound` if it does not exist.
    pub async fn get_reconciliation(
        &self,
        id: ReconciliationId,
    ) -> Result<CodReconciliation, WalletError> {
        self.store
            .find_reconciliation(id)
            .await?
            .ok_or(WalletError::ReconciliationNotFound(id))
    }

    /// Lists the reconciliations of one day.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    pub async fn reconciliations_by_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<CodReconciliation>, WalletError> {
        Ok(self.store.list_reconciliations_by_date(date).await?)
    }

    /// Lists a shipper's reconciliations, latest day first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    pub async fn reconciliations_for_shipper(
        &self,
        shipper_id: OwnerId,
        page: PageRequest,
    ) -> Result<PageResponse<CodReconciliation>, WalletError> {
        Ok(self
            .store
            .list_reconciliations_by_shipper(shipper_id, page.clamped())
            .await?)
    }

    /// Corrects the figures of a reconciliation that has not settled.
    ///
    /// # Errors
    ///
    /// - `ReconciliationNotFound` if it does not exist
    /// - `ReconciliationSettled` once it is DONE
    /// - `DepositReduction` if a correction row would fall below the deposit already credited
    pub async fn update_reconciliation_totals(
        &self,
        id: ReconciliationId,
        total_collected: Money,
        total_deposited: Money,
    ) -> Result<CodReconciliation, WalletError> {
        let _guard = self.lock(id.into_inner()).await;

        for attempt in self.attempts() {
            let current = self.get_reconciliation(id).await?;
            let updated = ReconciliationService::update_totals(
                &current,
                total_collected,
                total_deposited,
                Utc::now(),
            )?;
            if let Some(settled_id) = current.corrects {
                let settled = self.get_reconciliation(settled_id).await?;
                ReconciliationService::correction_delta(settled.total_deposited, total_deposited)?;
            }
            let commit = LedgerCommit {
                reconciliation: Some(ReconciliationWrite {
                    reconciliation: updated.clone(),
                    expected_version: current.version,
                }),
                ..LedgerCommit::default()
            };

            match self.store.commit(commit).await {
                Ok(_) => {
                    tracing::info!(
                        reconciliation_id = %id,
                        collected = %total_collected,
                        deposited = %total_deposited,
                        difference = %updated.difference,
                        "Reconciliation totals updated"
                    );
                    return Ok(updated);
                }
                Err(err) if is_conflict(&err) => {
                    Self::note_conflict("update_reconciliation_totals", attempt, &err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("update_reconciliation_totals"))
    }

    /// Moves a reconciliation one step forward.
    ///
    /// PROCESSING → DONE credits the deposit to the shipper's wallet in the same commit, or
    /// records it as an unlinked credit when the shipper has no wallet. A correction credits
    /// only what its deposit adds to the row it corrects.
    ///
    /// # Errors
    ///
    /// - `ReconciliationNotFound` if it does not exist
    /// - `InvalidReconciliationTransition` once it is DONE
    pub async fn advance_reconciliation(
        &self,
        id: ReconciliationId,
    ) -> Result<CodReconciliation, WalletError> {
        let _guard = self.lock(id.into_inner()).await;
        let current = self.get_reconciliation(id).await?;

        // Settlement touches the shipper's wallet, so its lock is held for the whole loop.
        let wallet = match current.status {
            ReconciliationStatus::Processing => {
                self.store.find_wallet_by_owner(current.shipper_id).await?
            }
            _ => None,
        };
        let _wallet_guard = match &wallet {
            Some(wallet) => Some(self.lock(wallet.id.into_inner()).await),
            None => None,
        };

        // Settled rows are frozen, so the deposit already credited for the day cannot move.
        let already_credited = match current.corrects {
            Some(settled_id) => self.get_reconciliation(settled_id).await?.total_deposited,
            None => Money::ZERO,
        };

        for attempt in self.attempts() {
            let current = self.get_reconciliation(id).await?;
            let status = ReconciliationService::advance(current.status)?;
            let now = Utc::now();
            let mut updated = CodReconciliation {
                status,
                updated_at: now,
                version: current.version + 1,
                ..current.clone()
            };
            let mut commit = LedgerCommit::default();

            if status == ReconciliationStatus::Done {
                updated.completed_at = Some(now);
                if let Some(posting) =
                    ReconciliationService::settlement_posting(&current, already_credited)?
                {
                    match &wallet {
                        Some(wallet) => {
                            let snapshot = self.load_wallet(wallet.id).await?;
                            let plan = InvariantEnforcer::check(&snapshot, &posting, now)?;
                            updated.settlement_transaction_id =
                                plan.entry.as_ref().map(|entry| entry.id);
                            commit.wallet = Some(WalletWrite {
                                expected_version: snapshot.version,
                                wallet: plan.wallet,
                            });
                            commit.entry = plan.entry;
                        }
                        None => {
                            let PostingKind::Credit {
                                transaction_type, ..
                            } = posting.kind
                            else {
                                return Err(WalletError::InvariantViolation(
                                    "reconciliation settlement is not a credit".to_string(),
                                ));
                            };
                            let credit = UnlinkedCredit::record(
                                current.shipper_id,
                                transaction_type,
                                posting.amount(),
                                posting.reference_code,
                                posting.description,
                                CreditSource::Reconciliation,
                                now,
                            );
                            updated.unlinked_credit_id = Some(credit.id);
                            commit.unlinked = Some(UnlinkedWrite::Insert(credit));
                        }
                    }
                }
            }
            commit.reconciliation = Some(ReconciliationWrite {
                reconciliation: updated.clone(),
                expected_version: current.version,
            });

            match self.store.commit(commit).await {
                Ok(_) => {
                    tracing::info!(
                        reconciliation_id = %id,
                        shipper_id = %updated.shipper_id,
                        from = %current.status,
                        to = %updated.status,
                        corrects = ?updated.corrects,
                        settlement_transaction_id = ?updated.settlement_transaction_id,
                        unlinked_credit_id = ?updated.unlinked_credit_id,
                        "Reconciliation advanced"
                    );
                    if updated.status == ReconciliationStatus::Done
                        && updated.difference.is_negative()
                    {
                        tracing::warn!(
                            reconciliation_id = %id,
                            shipper_id = %updated.shipper_id,
                            difference = %updated.difference,
                            "Reconciliation settled with a cash shortfall"
                        );
                    }
                    return Ok(updated);
                }
                Err(err) if is_conflict(&err) => {
                    Self::note_conflict("advance_reconciliation", attempt, &err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("advance_reconciliation"))
    }
}
