//! PostgreSQL implementation of the wallet storage port.
//!
//! Every `LedgerCommit` runs in one database transaction. Wallet counters are written with a
//! compare-and-set on `version`, workflow rows with a compare-and-set on `status`; zero affected
//! rows means another writer got there first.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use coffer_core::history::ShipperBalanceHistory;
use coffer_core::ledger::{ReferenceCode, TransactionType, WalletTransaction};
use coffer_core::reconciliation::CodReconciliation;
use coffer_core::settlement::UnlinkedCredit;
use coffer_core::store::{
    LedgerCommit, ReconciliationWrite, StoreError, UnlinkedWrite, WalletStore, WalletWrite,
    WithdrawalWrite,
};
use coffer_core::wallet::{BankInfo, WalletAccount};
use coffer_core::withdrawal::{WithdrawalRequest, WithdrawalStatus};
use coffer_shared::types::{
    BalanceHistoryId, OwnerId, PageRequest, PageResponse, ReconciliationId, UnlinkedCreditId,
    WalletId, WalletTransactionId, WithdrawalId,
};

use super::mapping::{self, db_err, minor_units, unique_violation};
use crate::entities::{
    cod_reconciliations, shipper_balance_history, unlinked_credits, wallet_transactions, wallets,
    withdrawal_requests,
};

/// Name of the unique constraint on a wallet's ledger sequence.
const SEQUENCE_CONSTRAINT: &str = "uq_wtx_sequence";

/// `WalletStore` backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgWalletStore {
    db: DatabaseConnection,
}

impl PgWalletStore {
    /// Creates a new store over a connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn write_wallet(
        txn: &DatabaseTransaction,
        write: &WalletWrite,
    ) -> Result<WalletAccount, StoreError> {
        let wallet = &write.wallet;
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::value(minor_units(wallet.balance)?),
            )
            .col_expr(
                wallets::Column::PendingAmount,
                Expr::value(minor_units(wallet.pending_amount)?),
            )
            .col_expr(
                wallets::Column::TotalEarned,
                Expr::value(minor_units(wallet.total_earned)?),
            )
            .col_expr(
                wallets::Column::TotalWithdrawn,
                Expr::value(minor_units(wallet.total_withdrawn)?),
            )
            .col_expr(
                wallets::Column::LastSequence,
                Expr::value(wallet.last_sequence),
            )
            .col_expr(
                wallets::Column::Version,
                Expr::value(write.expected_version + 1),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(wallet.updated_at))
            .filter(wallets::Column::Id.eq(wallet.id.into_inner()))
            .filter(wallets::Column::Version.eq(write.expected_version))
            .exec(txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(StoreError::VersionConflict(wallet.id));
        }

        let stored = wallets::Entity::find_by_id(wallet.id.into_inner())
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("wallet {}", wallet.id)))?;
        mapping::wallet(stored)
    }

    async fn insert_entry(
        txn: &DatabaseTransaction,
        entry: &WalletTransaction,
    ) -> Result<(), StoreError> {
        let model = wallet_transactions::ActiveModel {
            id: Set(entry.id.into_inner()),
            wallet_id: Set(entry.wallet_id.into_inner()),
            sequence: Set(entry.sequence),
            transaction_type: Set(entry.transaction_type.as_str().to_string()),
            amount: Set(entry.amount.minor_units()),
            balance_before: Set(minor_units(entry.balance_before)?),
            balance_after: Set(minor_units(entry.balance_after)?),
            description: Set(entry.description.clone()),
            reference_code: Set(entry.reference_code.as_str().to_string()),
            created_at: Set(entry.created_at.into()),
        };

        match model.insert(txn).await {
            Ok(_) => Ok(()),
            Err(err) => match unique_violation(&err) {
                Some(message) if message.contains(SEQUENCE_CONSTRAINT) => {
                    Err(StoreError::VersionConflict(entry.wallet_id))
                }
                Some(_) => Err(StoreError::DuplicateReference(
                    entry.reference_code.to_string(),
                )),
                None => Err(db_err(err)),
            },
        }
    }

    async fn write_unlinked(
        txn: &DatabaseTransaction,
        write: &UnlinkedWrite,
    ) -> Result<(), StoreError> {
        match write {
            UnlinkedWrite::Insert(credit) => {
                let model = unlinked_credits::ActiveModel {
                    id: Set(credit.id.into_inner()),
                    owner_id: Set(credit.owner_id.into_inner()),
                    transaction_type: Set(credit.transaction_type.as_str().to_string()),
                    amount: Set(minor_units(credit.amount)?),
                    reference_code: Set(credit.reference_code.as_str().to_string()),
                    description: Set(credit.description.clone()),
                    source: Set(credit.source.as_str().to_string()),
                    created_at: Set(credit.created_at.into()),
                    linked_at: Set(credit.linked_at.map(Into::into)),
                    linked_transaction_id: Set(credit
                        .linked_transaction_id
                        .map(WalletTransactionId::into_inner)),
                };
                match model.insert(txn).await {
                    Ok(_) => Ok(()),
                    Err(err) if unique_violation(&err).is_some() => Err(StoreError::Duplicate(
                        format!("unlinked credit {}", credit.reference_code),
                    )),
                    Err(err) => Err(db_err(err)),
                }
            }
            UnlinkedWrite::Link {
                id,
                transaction_id,
                linked_at,
            } => {
                let result = unlinked_credits::Entity::update_many()
                    .col_expr(unlinked_credits::Column::LinkedAt, Expr::value(*linked_at))
                    .col_expr(
                        unlinked_credits::Column::LinkedTransactionId,
                        Expr::value(transaction_id.into_inner()),
                    )
                    .filter(unlinked_credits::Column::Id.eq(id.into_inner()))
                    .filter(unlinked_credits::Column::LinkedTransactionId.is_null())
                    .exec(txn)
                    .await
                    .map_err(db_err)?;
                if result.rows_affected == 0 {
                    let exists = unlinked_credits::Entity::find_by_id(id.into_inner())
                        .one(txn)
                        .await
                        .map_err(db_err)?
                        .is_some();
                    return Err(if exists {
                        StoreError::StatusConflict(format!("unlinked credit {id}"))
                    } else {
                        StoreError::NotFound(format!("unlinked credit {id}"))
                    });
                }
                Ok(())
            }
        }
    }

    async fn write_withdrawal(
        txn: &DatabaseTransaction,
        write: &WithdrawalWrite,
    ) -> Result<(), StoreError> {
        match write {
            WithdrawalWrite::Insert(request) => {
                let model = withdrawal_requests::ActiveModel {
                    id: Set(request.id.into_inner()),
                    wallet_id: Set(request.wallet_id.into_inner()),
                    owner_id: Set(request.owner_id.into_inner()),
                    amount: Set(minor_units(request.amount)?),
                    bank_name: Set(request.bank.bank_name.clone()),
                    bank_account_number: Set(request.bank.bank_account_number.clone()),
                    bank_account_name: Set(request.bank.bank_account_name.clone()),
                    note: Set(request.note.clone()),
                    admin_note: Set(request.admin_note.clone()),
                    status: Set(request.status.as_str().to_string()),
                    created_at: Set(request.created_at.into()),
                    updated_at: Set(request.updated_at.into()),
                    processed_at: Set(request.processed_at.map(Into::into)),
                };
                match model.insert(txn).await {
                    Ok(_) => Ok(()),
                    Err(err) if unique_violation(&err).is_some() => {
                        Err(StoreError::Duplicate(format!("withdrawal {}", request.id)))
                    }
                    Err(err) => Err(db_err(err)),
                }
            }
            WithdrawalWrite::Update {
                request,
                expected_status,
            } => {
                let result = withdrawal_requests::Entity::update_many()
                    .col_expr(
                        withdrawal_requests::Column::Status,
                        Expr::value(request.status.as_str()),
                    )
                    .col_expr(
                        withdrawal_requests::Column::AdminNote,
                        Expr::value(request.admin_note.clone()),
                    )
                    .col_expr(
                        withdrawal_requests::Column::UpdatedAt,
                        Expr::value(request.updated_at),
                    )
                    .col_expr(
                        withdrawal_requests::Column::ProcessedAt,
                        Expr::value(request.processed_at),
                    )
                    .filter(withdrawal_requests::Column::Id.eq(request.id.into_inner()))
                    .filter(withdrawal_requests::Column::Status.eq(expected_status.as_str()))
                    .exec(txn)
                    .await
                    .map_err(db_err)?;
                if result.rows_affected == 0 {
                    return Err(StoreError::StatusConflict(format!("withdrawal {}", request.id)));
                }
                Ok(())
            }
        }
    }

    async fn write_reconciliation(
        txn: &DatabaseTransaction,
        write: &ReconciliationWrite,
    ) -> Result<(), StoreError> {
        let rec = &write.reconciliation;
        let result = cod_reconciliations::Entity::update_many()
            .col_expr(
                cod_reconciliations::Column::Status,
                Expr::value(rec.status.as_str()),
            )
            .col_expr(
                cod_reconciliations::Column::TotalCollected,
                Expr::value(minor_units(rec.total_collected)?),
            )
            .col_expr(
                cod_reconciliations::Column::TotalDeposited,
                Expr::value(minor_units(rec.total_deposited)?),
            )
            .col_expr(
                cod_reconciliations::Column::Difference,
                Expr::value(rec.difference.minor_units()),
            )
            .col_expr(
                cod_reconciliations::Column::SettlementTransactionId,
                Expr::value(
                    rec.settlement_transaction_id
                        .map(WalletTransactionId::into_inner),
                ),
            )
            .col_expr(
                cod_reconciliations::Column::UnlinkedCreditId,
                Expr::value(rec.unlinked_credit_id.map(UnlinkedCreditId::into_inner)),
            )
            .col_expr(
                cod_reconciliations::Column::UpdatedAt,
                Expr::value(rec.updated_at),
            )
            .col_expr(
                cod_reconciliations::Column::CompletedAt,
                Expr::value(rec.completed_at),
            )
            .col_expr(
                cod_reconciliations::Column::Version,
                Expr::value(write.expected_version + 1),
            )
            .filter(cod_reconciliations::Column::Id.eq(rec.id.into_inner()))
            .filter(cod_reconciliations::Column::Version.eq(write.expected_version))
            .exec(txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(StoreError::StatusConflict(format!("reconciliation {}", rec.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn insert_wallet(&self, wallet: &WalletAccount) -> Result<(), StoreError> {
        let model = wallets::ActiveModel {
            id: Set(wallet.id.into_inner()),
            owner_id: Set(wallet.owner_id.into_inner()),
            bank_name: Set(wallet.bank.bank_name.clone()),
            bank_account_number: Set(wallet.bank.bank_account_number.clone()),
            bank_account_name: Set(wallet.bank.bank_account_name.clone()),
            is_active: Set(wallet.is_active),
            balance: Set(minor_units(wallet.balance)?),
            pending_amount: Set(minor_units(wallet.pending_amount)?),
            total_earned: Set(minor_units(wallet.total_earned)?),
            total_withdrawn: Set(minor_units(wallet.total_withdrawn)?),
            version: Set(wallet.version),
            last_sequence: Set(wallet.last_sequence),
            created_at: Set(wallet.created_at.into()),
            updated_at: Set(wallet.updated_at.into()),
        };
        match model.insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(err) if unique_violation(&err).is_some() => Err(StoreError::Duplicate(format!(
                "wallet for owner {}",
                wallet.owner_id
            ))),
            Err(err) => Err(db_err(err)),
        }
    }

    async fn find_wallet_by_owner(
        &self,
        owner_id: OwnerId,
    ) -> Result<Option<WalletAccount>, StoreError> {
        wallets::Entity::find()
            .filter(wallets::Column::OwnerId.eq(owner_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(mapping::wallet)
            .transpose()
    }

    async fn find_wallet(&self, wallet_id: WalletId) -> Result<Option<WalletAccount>, StoreError> {
        wallets::Entity::find_by_id(wallet_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(mapping::wallet)
            .transpose()
    }

    async fn update_wallet_metadata(
        &self,
        wallet_id: WalletId,
        bank: &BankInfo,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<WalletAccount, StoreError> {
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::BankName,
                Expr::value(bank.bank_name.clone()),
            )
            .col_expr(
                wallets::Column::BankAccountNumber,
                Expr::value(bank.bank_account_number.clone()),
            )
            .col_expr(
                wallets::Column::BankAccountName,
                Expr::value(bank.bank_account_name.clone()),
            )
            .col_expr(wallets::Column::IsActive, Expr::value(is_active))
            .col_expr(wallets::Column::UpdatedAt, Expr::value(now))
            .filter(wallets::Column::Id.eq(wallet_id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("wallet {wallet_id}")));
        }
        self.find_wallet(wallet_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("wallet {wallet_id}")))
    }

    async fn find_entry(
        &self,
        wallet_id: WalletId,
        transaction_type: TransactionType,
        reference_code: &ReferenceCode,
    ) -> Result<Option<WalletTransaction>, StoreError> {
        wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet_id.into_inner()))
            .filter(wallet_transactions::Column::TransactionType.eq(transaction_type.as_str()))
            .filter(wallet_transactions::Column::ReferenceCode.eq(reference_code.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(mapping::entry)
            .transpose()
    }

    async fn find_entry_by_id(
        &self,
        id: WalletTransactionId,
    ) -> Result<Option<WalletTransaction>, StoreError> {
        wallet_transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(mapping::entry)
            .transpose()
    }

    async fn list_entries(
        &self,
        wallet_id: WalletId,
        page: PageRequest,
    ) -> Result<PageResponse<WalletTransaction>, StoreError> {
        let page = page.clamped();
        let query = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet_id.into_inner()));
        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(wallet_transactions::Column::Sequence)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let data = rows
            .into_iter()
            .map(mapping::entry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageResponse::new(data, page, total))
    }

    async fn all_entries(&self, wallet_id: WalletId) -> Result<Vec<WalletTransaction>, StoreError> {
        wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet_id.into_inner()))
            .order_by_asc(wallet_transactions::Column::Sequence)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(mapping::entry)
            .collect()
    }

    async fn find_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> Result<Option<WithdrawalRequest>, StoreError> {
        withdrawal_requests::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(mapping::withdrawal)
            .transpose()
    }

    async fn list_withdrawals(
        &self,
        wallet_id: WalletId,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, StoreError> {
        let page = page.clamped();
        let query = withdrawal_requests::Entity::find()
            .filter(withdrawal_requests::Column::WalletId.eq(wallet_id.into_inner()));
        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(withdrawal_requests::Column::CreatedAt)
            .order_by_desc(withdrawal_requests::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let data = rows
            .into_iter()
            .map(mapping::withdrawal)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageResponse::new(data, page, total))
    }

    async fn all_withdrawals(
        &self,
        wallet_id: WalletId,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        withdrawal_requests::Entity::find()
            .filter(withdrawal_requests::Column::WalletId.eq(wallet_id.into_inner()))
            .order_by_asc(withdrawal_requests::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(mapping::withdrawal)
            .collect()
    }

    async fn list_withdrawals_by_status(
        &self,
        status: WithdrawalStatus,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, StoreError> {
        let page = page.clamped();
        let query = withdrawal_requests::Entity::find()
            .filter(withdrawal_requests::Column::Status.eq(status.as_str()));
        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_asc(withdrawal_requests::Column::CreatedAt)
            .order_by_asc(withdrawal_requests::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let data = rows
            .into_iter()
            .map(mapping::withdrawal)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageResponse::new(data, page, total))
    }

    async fn insert_reconciliation(
        &self,
        reconciliation: &CodReconciliation,
    ) -> Result<(), StoreError> {
        let model = cod_reconciliations::ActiveModel {
            id: Set(reconciliation.id.into_inner()),
            shipper_id: Set(reconciliation.shipper_id.into_inner()),
            date: Set(reconciliation.date),
            status: Set(reconciliation.status.as_str().to_string()),
            corrects: Set(reconciliation.corrects.map(ReconciliationId::into_inner)),
            total_collected: Set(minor_units(reconciliation.total_collected)?),
            total_deposited: Set(minor_units(reconciliation.total_deposited)?),
            difference: Set(reconciliation.difference.minor_units()),
            settlement_transaction_id: Set(None),
            unlinked_credit_id: Set(None),
            created_at: Set(reconciliation.created_at.into()),
            updated_at: Set(reconciliation.updated_at.into()),
            completed_at: Set(None),
            version: Set(reconciliation.version),
        };
        match model.insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(err) if unique_violation(&err).is_some() => {
                Err(StoreError::Duplicate(match reconciliation.corrects {
                    Some(settled) => format!("correction of reconciliation {settled}"),
                    None => format!(
                        "reconciliation for shipper {} on {}",
                        reconciliation.shipper_id, reconciliation.date
                    ),
                }))
            }
            Err(err) => Err(db_err(err)),
        }
    }

    async fn find_reconciliation(
        &self,
        id: ReconciliationId,
    ) -> Result<Option<CodReconciliation>, StoreError> {
        cod_reconciliations::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(mapping::reconciliation)
            .transpose()
    }

    async fn list_reconciliations_by_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<CodReconciliation>, StoreError> {
        cod_reconciliations::Entity::find()
            .filter(cod_reconciliations::Column::Date.eq(date))
            .order_by_asc(cod_reconciliations::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(mapping::reconciliation)
            .collect()
    }

    async fn list_reconciliations_by_shipper(
        &self,
        shipper_id: OwnerId,
        page: PageRequest,
    ) -> Result<PageResponse<CodReconciliation>, StoreError> {
        let page = page.clamped();
        let query = cod_reconciliations::Entity::find()
            .filter(cod_reconciliations::Column::ShipperId.eq(shipper_id.into_inner()));
        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(cod_reconciliations::Column::Date)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let data = rows
            .into_iter()
            .map(mapping::reconciliation)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageResponse::new(data, page, total))
    }

    async fn find_unlinked_credit(
        &self,
        id: UnlinkedCreditId,
    ) -> Result<Option<UnlinkedCredit>, StoreError> {
        unlinked_credits::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(mapping::unlinked_credit)
            .transpose()
    }

    async fn find_unlinked_by_reference(
        &self,
        owner_id: OwnerId,
        transaction_type: TransactionType,
        reference_code: &ReferenceCode,
    ) -> Result<Option<UnlinkedCredit>, StoreError> {
        unlinked_credits::Entity::find()
            .filter(unlinked_credits::Column::OwnerId.eq(owner_id.into_inner()))
            .filter(unlinked_credits::Column::TransactionType.eq(transaction_type.as_str()))
            .filter(unlinked_credits::Column::ReferenceCode.eq(reference_code.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(mapping::unlinked_credit)
            .transpose()
    }

    async fn list_unlinked_credits(
        &self,
        owner_id: OwnerId,
    ) -> Result<Vec<UnlinkedCredit>, StoreError> {
        unlinked_credits::Entity::find()
            .filter(unlinked_credits::Column::OwnerId.eq(owner_id.into_inner()))
            .order_by_asc(unlinked_credits::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(mapping::unlinked_credit)
            .collect()
    }

    async fn latest_balance_history(
        &self,
        shipper_id: OwnerId,
    ) -> Result<Option<ShipperBalanceHistory>, StoreError> {
        shipper_balance_history::Entity::find()
            .filter(shipper_balance_history::Column::ShipperId.eq(shipper_id.into_inner()))
            .order_by_desc(shipper_balance_history::Column::Date)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(mapping::balance_history)
            .transpose()
    }

    async fn insert_balance_history(
        &self,
        row: &ShipperBalanceHistory,
        expected_latest: Option<BalanceHistoryId>,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Serializes appends per shipper across processes, including the very first row.
        txn.execute_unprepared(&format!(
            "SELECT pg_advisory_xact_lock(hashtextextended('{}', 0))",
            row.shipper_id
        ))
        .await
        .map_err(db_err)?;

        let duplicate = shipper_balance_history::Entity::find()
            .filter(shipper_balance_history::Column::ShipperId.eq(row.shipper_id.into_inner()))
            .filter(shipper_balance_history::Column::Date.eq(row.date))
            .one(&txn)
            .await
            .map_err(db_err)?;
        if duplicate.is_some() {
            return Err(StoreError::Duplicate(format!(
                "balance history for shipper {} on {}",
                row.shipper_id, row.date
            )));
        }

        let latest = shipper_balance_history::Entity::find()
            .filter(shipper_balance_history::Column::ShipperId.eq(row.shipper_id.into_inner()))
            .order_by_desc(shipper_balance_history::Column::Date)
            .one(&txn)
            .await
            .map_err(db_err)?;
        if latest.map(|latest| BalanceHistoryId::from_uuid(latest.id)) != expected_latest {
            return Err(StoreError::StatusConflict(format!(
                "balance history of shipper {}",
                row.shipper_id
            )));
        }

        shipper_balance_history::ActiveModel {
            id: Set(row.id.into_inner()),
            shipper_id: Set(row.shipper_id.into_inner()),
            date: Set(row.date),
            opening_balance: Set(row.opening_balance.minor_units()),
            collected: Set(minor_units(row.collected)?),
            deposited: Set(minor_units(row.deposited)?),
            bonus: Set(minor_units(row.bonus)?),
            final_balance: Set(row.final_balance.minor_units()),
            created_at: Set(row.created_at.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)
    }

    async fn list_balance_history(
        &self,
        shipper_id: OwnerId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ShipperBalanceHistory>, StoreError> {
        let mut query = shipper_balance_history::Entity::find()
            .filter(shipper_balance_history::Column::ShipperId.eq(shipper_id.into_inner()));
        if let Some(from) = from {
            query = query.filter(shipper_balance_history::Column::Date.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(shipper_balance_history::Column::Date.lte(to));
        }
        query
            .order_by_asc(shipper_balance_history::Column::Date)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(mapping::balance_history)
            .collect()
    }

    async fn commit(&self, commit: LedgerCommit) -> Result<Option<WalletAccount>, StoreError> {
        // Dropping the transaction on an early return rolls it back.
        let txn = self.db.begin().await.map_err(db_err)?;

        let written = match &commit.wallet {
            Some(write) => Some(Self::write_wallet(&txn, write).await?),
            None => None,
        };
        if let Some(entry) = &commit.entry {
            Self::insert_entry(&txn, entry).await?;
        }
        if let Some(write) = &commit.unlinked {
            Self::write_unlinked(&txn, write).await?;
        }
        if let Some(write) = &commit.withdrawal {
            Self::write_withdrawal(&txn, write).await?;
        }
        if let Some(write) = &commit.reconciliation {
            Self::write_reconciliation(&txn, write).await?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(written)
    }
}
