//! In-memory wallet storage for tests and local runs.
//!
//! All state sits behind one `RwLock`, so a commit validates and applies every write while
//! holding the write half and readers never see a partial commit.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use coffer_shared::types::{
    BalanceHistoryId, OwnerId, PageRequest, PageResponse, ReconciliationId, UnlinkedCreditId,
    WalletId, WalletTransactionId, WithdrawalId,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use super::{
    LedgerCommit, ReconciliationWrite, StoreError, UnlinkedWrite, WalletStore, WithdrawalWrite,
};
use crate::history::ShipperBalanceHistory;
use crate::ledger::{ReferenceCode, TransactionType, WalletTransaction};
use crate::reconciliation::CodReconciliation;
use crate::settlement::UnlinkedCredit;
use crate::wallet::{BankInfo, WalletAccount};
use crate::withdrawal::{WithdrawalRequest, WithdrawalStatus};

type LedgerKey = (WalletId, TransactionType, String);
type RegisterKey = (OwnerId, TransactionType, String);

#[derive(Default)]
struct State {
    wallets: HashMap<WalletId, WalletAccount>,
    by_owner: HashMap<OwnerId, WalletId>,
    /// Entries per wallet in sequence order.
    entries: HashMap<WalletId, Vec<WalletTransaction>>,
    entry_keys: HashSet<LedgerKey>,
    withdrawals: HashMap<WithdrawalId, WithdrawalRequest>,
    reconciliations: HashMap<ReconciliationId, CodReconciliation>,
    reconciliation_keys: HashSet<(OwnerId, NaiveDate)>,
    /// Settled rows that already have a correction.
    corrected: HashSet<ReconciliationId>,
    unlinked: HashMap<UnlinkedCreditId, UnlinkedCredit>,
    unlinked_keys: HashSet<RegisterKey>,
    /// History rows per shipper in date order.
    history: HashMap<OwnerId, Vec<ShipperBalanceHistory>>,
}

impl State {
    /// Checks every write of `commit` without changing anything.
    fn validate(&self, commit: &LedgerCommit) -> Result<(), StoreError> {
        if let Some(write) = &commit.wallet {
            let stored = self
                .wallets
                .get(&write.wallet.id)
                .ok_or_else(|| StoreError::NotFound(format!("wallet {}", write.wallet.id)))?;
            if stored.version != write.expected_version {
                return Err(StoreError::VersionConflict(stored.id));
            }
        }

        if let Some(entry) = &commit.entry {
            let key = ledger_key(
                entry.wallet_id,
                entry.transaction_type,
                &entry.reference_code,
            );
            if self.entry_keys.contains(&key) {
                return Err(StoreError::DuplicateReference(
                    entry.reference_code.to_string(),
                ));
            }
            let committed = self.entries.get(&entry.wallet_id).map_or(0, Vec::len);
            if usize::try_from(entry.sequence).ok() != Some(committed + 1) {
                return Err(StoreError::VersionConflict(entry.wallet_id));
            }
        }

        match &commit.withdrawal {
            Some(WithdrawalWrite::Insert(request)) => {
                if self.withdrawals.contains_key(&request.id) {
                    return Err(StoreError::Duplicate(format!("withdrawal {}", request.id)));
                }
            }
            Some(WithdrawalWrite::Update {
                request,
                expected_status,
            }) => {
                let stored = self
                    .withdrawals
                    .get(&request.id)
                    .ok_or_else(|| StoreError::NotFound(format!("withdrawal {}", request.id)))?;
                if stored.status != *expected_status {
                    return Err(StoreError::StatusConflict(format!("withdrawal {}", request.id)));
                }
            }
            None => {}
        }

        if let Some(ReconciliationWrite {
            reconciliation,
            expected_version,
        }) = &commit.reconciliation
        {
            let stored = self.reconciliations.get(&reconciliation.id).ok_or_else(|| {
                StoreError::NotFound(format!("reconciliation {}", reconciliation.id))
            })?;
            if stored.version != *expected_version {
                return Err(StoreError::StatusConflict(format!(
                    "reconciliation {}",
                    reconciliation.id
                )));
            }
        }

        match &commit.unlinked {
            Some(UnlinkedWrite::Insert(credit)) => {
                let key = register_key(
                    credit.owner_id,
                    credit.transaction_type,
                    &credit.reference_code,
                );
                if self.unlinked_keys.contains(&key) {
                    return Err(StoreError::Duplicate(format!(
                        "unlinked credit {}",
                        credit.reference_code
                    )));
                }
            }
            Some(UnlinkedWrite::Link { id, .. }) => {
                let stored = self
                    .unlinked
                    .get(id)
                    .ok_or_else(|| StoreError::NotFound(format!("unlinked credit {id}")))?;
                if stored.is_linked() {
                    return Err(StoreError::StatusConflict(format!("unlinked credit {id}")));
                }
            }
            None => {}
        }

        Ok(())
    }

    /// Applies a validated commit.
    fn apply(&mut self, commit: LedgerCommit) -> Option<WalletAccount> {
        let mut written = None;
        if let Some(write) = commit.wallet {
            if let Some(stored) = self.wallets.get_mut(&write.wallet.id) {
                stored.balance = write.wallet.balance;
                stored.pending_amount = write.wallet.pending_amount;
                stored.total_earned = write.wallet.total_earned;
                stored.total_withdrawn = write.wallet.total_withdrawn;
                stored.last_sequence = write.wallet.last_sequence;
                stored.updated_at = write.wallet.updated_at;
                stored.version = write.expected_version + 1;
                written = Some(stored.clone());
            }
        }

        if let Some(entry) = commit.entry {
            self.entry_keys.insert(ledger_key(
                entry.wallet_id,
                entry.transaction_type,
                &entry.reference_code,
            ));
            self.entries.entry(entry.wallet_id).or_default().push(entry);
        }

        match commit.withdrawal {
            Some(WithdrawalWrite::Insert(request) | WithdrawalWrite::Update { request, .. }) => {
                self.withdrawals.insert(request.id, request);
            }
            None => {}
        }

        if let Some(write) = commit.reconciliation {
            self.reconciliations
                .insert(write.reconciliation.id, write.reconciliation);
        }

        match commit.unlinked {
            Some(UnlinkedWrite::Insert(credit)) => {
                self.unlinked_keys.insert(register_key(
                    credit.owner_id,
                    credit.transaction_type,
                    &credit.reference_code,
                ));
                self.unlinked.insert(credit.id, credit);
            }
            Some(UnlinkedWrite::Link {
                id,
                transaction_id,
                linked_at,
            }) => {
                if let Some(credit) = self.unlinked.get_mut(&id) {
                    credit.linked_transaction_id = Some(transaction_id);
                    credit.linked_at = Some(linked_at);
                }
            }
            None => {}
        }

        written
    }
}

fn ledger_key(
    wallet_id: WalletId,
    transaction_type: TransactionType,
    reference_code: &ReferenceCode,
) -> LedgerKey {
    (wallet_id, transaction_type, reference_code.as_str().to_string())
}

fn register_key(
    owner_id: OwnerId,
    transaction_type: TransactionType,
    reference_code: &ReferenceCode,
) -> RegisterKey {
    (owner_id, transaction_type, reference_code.as_str().to_string())
}

fn paged<T: Clone>(items: &[T], page: PageRequest) -> PageResponse<T> {
    let page = page.clamped();
    PageResponse::new(
        page.slice(items),
        page,
        u64::try_from(items.len()).unwrap_or(u64::MAX),
    )
}

/// In-memory `WalletStore`.
#[derive(Default)]
pub struct MemoryWalletStore {
    state: RwLock<State>,
}

impl MemoryWalletStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed ledger entries across all wallets.
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.values().map(Vec::len).sum()
    }

    /// Overwrites a stored wallet as is, bypassing every check.
    ///
    /// Only meant for simulating corruption in tests.
    pub async fn overwrite_wallet(&self, wallet: WalletAccount) {
        self.state.write().await.wallets.insert(wallet.id, wallet);
    }
}

#[async_trait]
impl WalletStore for MemoryWalletStore {
    async fn insert_wallet(&self, wallet: &WalletAccount) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.by_owner.contains_key(&wallet.owner_id) {
            return Err(StoreError::Duplicate(format!("wallet for owner {}", wallet.owner_id)));
        }
        state.by_owner.insert(wallet.owner_id, wallet.id);
        state.wallets.insert(wallet.id, wallet.clone());
        Ok(())
    }

    async fn find_wallet_by_owner(
        &self,
        owner_id: OwnerId,
    ) -> Result<Option<WalletAccount>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .by_owner
            .get(&owner_id)
            .and_then(|id| state.wallets.get(id))
            .cloned())
    }

    async fn find_wallet(&self, wallet_id: WalletId) -> Result<Option<WalletAccount>, StoreError> {
        Ok(self.state.read().await.wallets.get(&wallet_id).cloned())
    }

    async fn update_wallet_metadata(
        &self,
        wallet_id: WalletId,
        bank: &BankInfo,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<WalletAccount, StoreError> {
        let mut state = self.state.write().await;
        let wallet = state
            .wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| StoreError::NotFound(format!("wallet {wallet_id}")))?;
        wallet.bank = bank.clone();
        wallet.is_active = is_active;
        wallet.updated_at = now;
        Ok(wallet.clone())
    }

    async fn find_entry(
        &self,
        wallet_id: WalletId,
        transaction_type: TransactionType,
        reference_code: &ReferenceCode,
    ) -> Result<Option<WalletTransaction>, StoreError> {
        let state = self.state.read().await;
        Ok(state.entries.get(&wallet_id).and_then(|entries| {
            entries
                .iter()
                .find(|entry| {
                    entry.transaction_type == transaction_type
                        && entry.reference_code == *reference_code
                })
                .cloned()
        }))
    }

    async fn find_entry_by_id(
        &self,
        id: WalletTransactionId,
    ) -> Result<Option<WalletTransaction>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .values()
            .flatten()
            .find(|entry| entry.id == id)
            .cloned())
    }

    async fn list_entries(
        &self,
        wallet_id: WalletId,
        page: PageRequest,
    ) -> Result<PageResponse<WalletTransaction>, StoreError> {
        let state = self.state.read().await;
        let mut entries = state.entries.get(&wallet_id).cloned().unwrap_or_default();
        entries.reverse();
        Ok(paged(&entries, page))
    }

    async fn all_entries(&self, wallet_id: WalletId) -> Result<Vec<WalletTransaction>, StoreError> {
        let state = self.state.read().await;
        Ok(state.entries.get(&wallet_id).cloned().unwrap_or_default())
    }

    async fn find_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> Result<Option<WithdrawalRequest>, StoreError> {
        Ok(self.state.read().await.withdrawals.get(&id).cloned())
    }

    async fn list_withdrawals(
        &self,
        wallet_id: WalletId,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, StoreError> {
        let mut requests = self.all_withdrawals(wallet_id).await?;
        requests.reverse();
        Ok(paged(&requests, page))
    }

    async fn all_withdrawals(
        &self,
        wallet_id: WalletId,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let state = self.state.read().await;
        let mut requests: Vec<WithdrawalRequest> = state
            .withdrawals
            .values()
            .filter(|request| request.wallet_id == wallet_id)
            .cloned()
            .collect();
        requests.sort_by_key(|request| (request.created_at, request.id));
        Ok(requests)
    }

    async fn list_withdrawals_by_status(
        &self,
        status: WithdrawalStatus,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, StoreError> {
        let state = self.state.read().await;
        let mut requests: Vec<WithdrawalRequest> = state
            .withdrawals
            .values()
            .filter(|request| request.status == status)
            .cloned()
            .collect();
        requests.sort_by_key(|request| (request.created_at, request.id));
        Ok(paged(&requests, page))
    }

    async fn insert_reconciliation(
        &self,
        reconciliation: &CodReconciliation,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(settled) = reconciliation.corrects {
            if !state.corrected.insert(settled) {
                return Err(StoreError::Duplicate(format!(
                    "correction of reconciliation {settled}"
                )));
            }
        } else {
            let key = (reconciliation.shipper_id, reconciliation.date);
            if !state.reconciliation_keys.insert(key) {
                return Err(StoreError::Duplicate(format!(
                    "reconciliation for shipper {} on {}",
                    reconciliation.shipper_id, reconciliation.date
                )));
            }
        }
        state
            .reconciliations
            .insert(reconciliation.id, reconciliation.clone());
        Ok(())
    }

    async fn find_reconciliation(
        &self,
        id: ReconciliationId,
    ) -> Result<Option<CodReconciliation>, StoreError> {
        Ok(self.state.read().await.reconciliations.get(&id).cloned())
    }

    async fn list_reconciliations_by_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<CodReconciliation>, StoreError> {
        let state = self.state.read().await;
        let mut rows: Vec<CodReconciliation> = state
            .reconciliations
            .values()
            .filter(|row| row.date == date)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.created_at, row.id));
        Ok(rows)
    }

    async fn list_reconciliations_by_shipper(
        &self,
        shipper_id: OwnerId,
        page: PageRequest,
    ) -> Result<PageResponse<CodReconciliation>, StoreError> {
        let state = self.state.read().await;
        let mut rows: Vec<CodReconciliation> = state
            .reconciliations
            .values()
            .filter(|row| row.shipper_id == shipper_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(paged(&rows, page))
    }

    async fn find_unlinked_credit(
        &self,
        id: UnlinkedCreditId,
    ) -> Result<Option<UnlinkedCredit>, StoreError> {
        Ok(self.state.read().await.unlinked.get(&id).cloned())
    }

    async fn find_unlinked_by_reference(
        &self,
        owner_id: OwnerId,
        transaction_type: TransactionType,
        reference_code: &ReferenceCode,
    ) -> Result<Option<UnlinkedCredit>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .unlinked
            .values()
            .find(|credit| {
                credit.owner_id == owner_id
                    && credit.transaction_type == transaction_type
                    && credit.reference_code == *reference_code
            })
            .cloned())
    }

    async fn list_unlinked_credits(
        &self,
        owner_id: OwnerId,
    ) -> Result<Vec<UnlinkedCredit>, StoreError> {
        let state = self.state.read().await;
        let mut credits: Vec<UnlinkedCredit> = state
            .unlinked
            .values()
            .filter(|credit| credit.owner_id == owner_id)
            .cloned()
            .collect();
        credits.sort_by_key(|credit| (credit.created_at, credit.id));
        Ok(credits)
    }

    async fn latest_balance_history(
        &self,
        shipper_id: OwnerId,
    ) -> Result<Option<ShipperBalanceHistory>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .history
            .get(&shipper_id)
            .and_then(|rows| rows.last())
            .cloned())
    }

    async fn insert_balance_history(
        &self,
        row: &ShipperBalanceHistory,
        expected_latest: Option<BalanceHistoryId>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let rows = state.history.entry(row.shipper_id).or_default();
        if rows.iter().any(|existing| existing.date == row.date) {
            return Err(StoreError::Duplicate(format!(
                "balance history for shipper {} on {}",
                row.shipper_id, row.date
            )));
        }
        if rows.last().map(|latest| latest.id) != expected_latest {
            return Err(StoreError::StatusConflict(format!(
                "balance history of shipper {}",
                row.shipper_id
            )));
        }
        rows.push(row.clone());
        Ok(())
    }

    async fn list_balance_history(
        &self,
        shipper_id: OwnerId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ShipperBalanceHistory>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .history
            .get(&shipper_id)
            .map(|rows| {
                rows.iter()
                    .filter(|row| from.is_none_or(|from| row.date >= from))
                    .filter(|row| to.is_none_or(|to| row.date <= to))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, commit: LedgerCommit) -> Result<Option<WalletAccount>, StoreError> {
        let mut state = self.state.write().await;
        state.validate(&commit)?;
        Ok(state.apply(commit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::{InvariantEnforcer, Posting};
    use crate::reconciliation::{ReconciliationService, ReconciliationStatus};
    use crate::store::WalletWrite;
    use coffer_shared::types::Money;

    fn wallet() -> WalletAccount {
        WalletAccount::open(
            OwnerId::new(),
            BankInfo::new("VCB", "0123456789", "SHOP A"),
            Utc::now(),
        )
        .unwrap()
    }

    fn credit_commit(wallet: &WalletAccount, code: &str, amount: u64) -> LedgerCommit {
        let posting = Posting::credit(
            TransactionType::OrderPayment,
            Money::new(amount),
            ReferenceCode::external(code).unwrap(),
            "",
        );
        let plan = InvariantEnforcer::check(wallet, &posting, Utc::now()).unwrap();
        LedgerCommit {
            wallet: Some(WalletWrite {
                expected_version: wallet.version,
                wallet: plan.wallet,
            }),
            entry: plan.entry,
            ..LedgerCommit::default()
        }
    }

    #[tokio::test]
    async fn test_insert_wallet_once_per_owner() {
        let store = MemoryWalletStore::new();
        let first = wallet();
        store.insert_wallet(&first).await.unwrap();

        let mut second = wallet();
        second.owner_id = first.owner_id;
        assert!(matches!(
            store.insert_wallet(&second).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_bumps_version() {
        let store = MemoryWalletStore::new();
        let wallet = wallet();
        store.insert_wallet(&wallet).await.unwrap();

        let stored = store
            .commit(credit_commit(&wallet, "ORD-1", 100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.balance, Money::new(100));
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected_atomically() {
        let store = MemoryWalletStore::new();
        let wallet = wallet();
        store.insert_wallet(&wallet).await.unwrap();

        let first = credit_commit(&wallet, "ORD-1", 100);
        let stale = credit_commit(&wallet, "ORD-2", 50);
        store.commit(first).await.unwrap();

        assert_eq!(
            store.commit(stale).await,
            Err(StoreError::VersionConflict(wallet.id))
        );
        let stored = store.find_wallet(wallet.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Money::new(100));
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_reference_is_rejected() {
        let store = MemoryWalletStore::new();
        let wallet = wallet();
        store.insert_wallet(&wallet).await.unwrap();
        store
            .commit(credit_commit(&wallet, "ORD-1", 100))
            .await
            .unwrap();

        let reloaded = store.find_wallet(wallet.id).await.unwrap().unwrap();
        assert!(matches!(
            store.commit(credit_commit(&reloaded, "ORD-1", 100)).await,
            Err(StoreError::DuplicateReference(_))
        ));
    }

    #[tokio::test]
    async fn test_entries_are_listed_newest_first() {
        let store = MemoryWalletStore::new();
        let wallet = wallet();
        store.insert_wallet(&wallet).await.unwrap();
        for (n, code) in ["ORD-1", "ORD-2", "ORD-3"].iter().enumerate() {
            let current = store.find_wallet(wallet.id).await.unwrap().unwrap();
            store
                .commit(credit_commit(&current, code, 10 * (n as u64 + 1)))
                .await
                .unwrap();
        }

        let page = store
            .list_entries(wallet.id, PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.meta.total, 3);
        let sequences: Vec<i64> = page.data.iter().map(|entry| entry.sequence).collect();
        assert_eq!(sequences, vec![3, 2]);

        let all = store.all_entries(wallet.id).await.unwrap();
        let sequences: Vec<i64> = all.iter().map(|entry| entry.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    fn processing_reconciliation() -> CodReconciliation {
        let mut rec = CodReconciliation::new(
            OwnerId::new(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            Money::new(500_000),
            Money::new(480_000),
            Utc::now(),
        )
        .unwrap();
        rec.status = ReconciliationStatus::Processing;
        rec
    }

    #[tokio::test]
    async fn test_reconciliation_write_from_stale_snapshot_is_rejected() {
        let store = MemoryWalletStore::new();
        let snapshot = processing_reconciliation();
        store.insert_reconciliation(&snapshot).await.unwrap();

        let corrected = ReconciliationService::update_totals(
            &snapshot,
            Money::new(500_000),
            Money::new(500_000),
            Utc::now(),
        )
        .unwrap();
        let settled = CodReconciliation {
            status: ReconciliationStatus::Done,
            completed_at: Some(Utc::now()),
            version: snapshot.version + 1,
            ..snapshot.clone()
        };

        let write = |reconciliation: CodReconciliation| LedgerCommit {
            reconciliation: Some(ReconciliationWrite {
                reconciliation,
                expected_version: snapshot.version,
            }),
            ..LedgerCommit::default()
        };
        store.commit(write(corrected)).await.unwrap();
        assert!(matches!(
            store.commit(write(settled)).await,
            Err(StoreError::StatusConflict(_))
        ));

        let stored = store.find_reconciliation(snapshot.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReconciliationStatus::Processing);
        assert_eq!(stored.total_deposited, Money::new(500_000));
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_one_original_and_one_correction_per_settled_row() {
        let store = MemoryWalletStore::new();
        let mut settled = processing_reconciliation();
        settled.status = ReconciliationStatus::Done;
        store.insert_reconciliation(&settled).await.unwrap();

        let mut again = processing_reconciliation();
        again.shipper_id = settled.shipper_id;
        assert!(matches!(
            store.insert_reconciliation(&again).await,
            Err(StoreError::Duplicate(_))
        ));

        let correction = |deposited: u64| {
            CodReconciliation::correction(
                &settled,
                Money::new(500_000),
                Money::new(deposited),
                Utc::now(),
            )
            .unwrap()
        };
        store.insert_reconciliation(&correction(490_000)).await.unwrap();
        assert!(matches!(
            store.insert_reconciliation(&correction(500_000)).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_balance_history_guards_latest_row() {
        let store = MemoryWalletStore::new();
        let shipper = OwnerId::new();
        let row = |day: u32| ShipperBalanceHistory {
            id: BalanceHistoryId::new(),
            shipper_id: shipper,
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            opening_balance: coffer_shared::types::SignedMoney::ZERO,
            collected: Money::ZERO,
            deposited: Money::ZERO,
            bonus: Money::ZERO,
            final_balance: coffer_shared::types::SignedMoney::ZERO,
            created_at: Utc::now(),
        };

        let first = row(1);
        store.insert_balance_history(&first, None).await.unwrap();
        assert!(matches!(
            store.insert_balance_history(&row(2), None).await,
            Err(StoreError::StatusConflict(_))
        ));
        assert!(matches!(
            store.insert_balance_history(&row(1), Some(first.id)).await,
            Err(StoreError::Duplicate(_))
        ));
        store
            .insert_balance_history(&row(2), Some(first.id))
            .await
            .unwrap();

        let from_second = store
            .list_balance_history(shipper, NaiveDate::from_ymd_opt(2024, 3, 2), None)
            .await
            .unwrap();
        assert_eq!(from_second.len(), 1);
    }
}
