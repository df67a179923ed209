//! Storage port for wallets, ledgers and workflow rows.
//!
//! Implementations must apply a `LedgerCommit` atomically: readers observe either none or all of
//! its writes. Two implementations exist, `MemoryWalletStore` here and the PostgreSQL store in
//! the `coffer-db` crate.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use coffer_shared::types::{
    BalanceHistoryId, OwnerId, PageRequest, PageResponse, ReconciliationId, UnlinkedCreditId,
    WalletId, WalletTransactionId, WithdrawalId,
};
use thiserror::Error;

use crate::history::ShipperBalanceHistory;
use crate::ledger::{ReferenceCode, TransactionType, WalletTransaction};
use crate::reconciliation::CodReconciliation;
use crate::settlement::UnlinkedCredit;
use crate::wallet::{BankInfo, WalletAccount};
use crate::withdrawal::{WithdrawalRequest, WithdrawalStatus};

pub use memory::MemoryWalletStore;

/// Errors reported by a `WalletStore`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The wallet's version moved since it was read.
    #[error("Wallet {0} was modified concurrently")]
    VersionConflict(WalletId),

    /// A ledger entry with the same idempotency key already exists.
    #[error("Ledger entry already exists for reference {0}")]
    DuplicateReference(String),

    /// A workflow row is no longer in the status it was read in.
    #[error("{0} changed concurrently")]
    StatusConflict(String),

    /// A uniqueness constraint other than the ledger key was violated.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A row addressed by a write does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Monetary update of a wallet, guarded by its version.
///
/// Only the balance counters, `last_sequence` and `updated_at` are written; the stored version
/// becomes `expected_version + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletWrite {
    /// Candidate state.
    pub wallet: WalletAccount,
    /// Version the candidate was planned from.
    pub expected_version: i64,
}

/// Withdrawal row change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalWrite {
    /// A new request.
    Insert(WithdrawalRequest),
    /// A status change, guarded by the status the request was read in.
    Update {
        /// New state.
        request: WithdrawalRequest,
        /// Status the change was planned from.
        expected_status: WithdrawalStatus,
    },
}

/// Reconciliation row change, guarded by the version it was read at.
///
/// The stored row takes `reconciliation.version`, which must be `expected_version + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationWrite {
    /// New state.
    pub reconciliation: CodReconciliation,
    /// Version the change was planned from.
    pub expected_version: i64,
}

/// Unlinked-credit register change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlinkedWrite {
    /// A new register row.
    Insert(UnlinkedCredit),
    /// Marks a row as applied; fails with `StatusConflict` if it is already linked.
    Link {
        /// Register row.
        id: UnlinkedCreditId,
        /// Entry the credit was applied as.
        transaction_id: WalletTransactionId,
        /// When it was applied.
        linked_at: DateTime<Utc>,
    },
}

/// One atomic unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerCommit {
    /// Wallet counters.
    pub wallet: Option<WalletWrite>,
    /// Ledger entry to append.
    pub entry: Option<WalletTransaction>,
    /// Withdrawal change.
    pub withdrawal: Option<WithdrawalWrite>,
    /// Reconciliation change.
    pub reconciliation: Option<ReconciliationWrite>,
    /// Register change.
    pub unlinked: Option<UnlinkedWrite>,
}

/// Storage port used by the engine.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Inserts a new wallet. `Duplicate` if the owner already has one.
    async fn insert_wallet(&self, wallet: &WalletAccount) -> Result<(), StoreError>;

    /// Finds the wallet of an owner.
    async fn find_wallet_by_owner(&self, owner_id: OwnerId)
    -> Result<Option<WalletAccount>, StoreError>;

    /// Finds a wallet by ID.
    async fn find_wallet(&self, wallet_id: WalletId) -> Result<Option<WalletAccount>, StoreError>;

    /// Updates wallet metadata without touching balances or the version.
    async fn update_wallet_metadata(
        &self,
        wallet_id: WalletId,
        bank: &BankInfo,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<WalletAccount, StoreError>;

    /// Finds an entry by its idempotency key.
    async fn find_entry(
        &self,
        wallet_id: WalletId,
        transaction_type: TransactionType,
        reference_code: &ReferenceCode,
    ) -> Result<Option<WalletTransaction>, StoreError>;

    /// Finds an entry by ID.
    async fn find_entry_by_id(
        &self,
        id: WalletTransactionId,
    ) -> Result<Option<WalletTransaction>, StoreError>;

    /// Lists a wallet's entries, newest first.
    async fn list_entries(
        &self,
        wallet_id: WalletId,
        page: PageRequest,
    ) -> Result<PageResponse<WalletTransaction>, StoreError>;

    /// Returns a wallet's whole ledger in sequence order.
    async fn all_entries(&self, wallet_id: WalletId) -> Result<Vec<WalletTransaction>, StoreError>;

    /// Finds a withdrawal request.
    async fn find_withdrawal(&self, id: WithdrawalId)
    -> Result<Option<WithdrawalRequest>, StoreError>;

    /// Lists a wallet's withdrawal requests, newest first.
    async fn list_withdrawals(
        &self,
        wallet_id: WalletId,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, StoreError>;

    /// Returns every withdrawal request of a wallet.
    async fn all_withdrawals(&self, wallet_id: WalletId)
    -> Result<Vec<WithdrawalRequest>, StoreError>;

    /// Lists requests in a status, oldest first.
    async fn list_withdrawals_by_status(
        &self,
        status: WithdrawalStatus,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, StoreError>;

    /// Inserts a reconciliation.
    ///
    /// `Duplicate` on an existing original row for `(shipper_id, date)`, or on a second
    /// correction of the same settled row.
    async fn insert_reconciliation(&self, reconciliation: &CodReconciliation)
    -> Result<(), StoreError>;

    /// Finds a reconciliation.
    async fn find_reconciliation(
        &self,
        id: ReconciliationId,
    ) -> Result<Option<CodReconciliation>, StoreError>;

    /// Lists reconciliations of one day, oldest first.
    async fn list_reconciliations_by_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<CodReconciliation>, StoreError>;

    /// Lists a shipper's reconciliations, latest day first.
    async fn list_reconciliations_by_shipper(
        &self,
        shipper_id: OwnerId,
        page: PageRequest,
    ) -> Result<PageResponse<CodReconciliation>, StoreError>;

    /// Finds a register row.
    async fn find_unlinked_credit(
        &self,
        id: UnlinkedCreditId,
    ) -> Result<Option<UnlinkedCredit>, StoreError>;

    /// Finds a register row by its idempotency key.
    async fn find_unlinked_by_reference(
        &self,
        owner_id: OwnerId,
        transaction_type: TransactionType,
        reference_code: &ReferenceCode,
    ) -> Result<Option<UnlinkedCredit>, StoreError>;

    /// Lists an owner's register rows, oldest first.
    async fn list_unlinked_credits(&self, owner_id: OwnerId)
    -> Result<Vec<UnlinkedCredit>, StoreError>;

    /// Returns a shipper's latest balance history row.
    async fn latest_balance_history(
        &self,
        shipper_id: OwnerId,
    ) -> Result<Option<ShipperBalanceHistory>, StoreError>;

    /// Appends a balance history row.
    ///
    /// `expected_latest` is the row the new one was built on; `StatusConflict` if another row was
    /// appended since, `Duplicate` on an existing `(shipper_id, date)`.
    async fn insert_balance_history(
        &self,
        row: &ShipperBalanceHistory,
        expected_latest: Option<BalanceHistoryId>,
    ) -> Result<(), StoreError>;

    /// Lists a shipper's rows between two days (inclusive), ascending by date.
    async fn list_balance_history(
        &self,
        shipper_id: OwnerId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ShipperBalanceHistory>, StoreError>;

    /// Applies every write of `commit` atomically and returns the stored wallet, if one was
    /// written.
    async fn commit(&self, commit: LedgerCommit) -> Result<Option<WalletAccount>, StoreError>;
}
