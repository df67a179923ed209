//! The wallet engine: the single entry point for every balance-affecting operation.
//!
//! Mutations of one wallet are serialized through an in-process async mutex keyed by the wallet
//! ID. Each mutation loads a fresh snapshot, asks the `InvariantEnforcer` for a plan and commits
//! wallet, ledger entry and workflow row changes through the store in one unit. The store's
//! version check catches writers in other processes; a conflicting commit is re-planned from a
//! fresh snapshot up to `max_commit_retries` times.

mod history;
mod reconciliation;
mod settlement;
mod wallet;
mod withdrawal;


use dashmap::DashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use coffer_shared::config::WalletConfig;
use coffer_shared::types::{OwnerId, WalletId};

use crate::error::WalletError;
use crate::store::{StoreError, WalletStore};
use crate::wallet::WalletAccount;

pub use wallet::CreatedWallet;
pub use withdrawal::NewWithdrawal;

/// Coordinates the store, the enforcer and the workflows.
pub struct WalletEngine {
    store: Arc<dyn WalletStore>,
    config: WalletConfig,
    /// Entries live only while some task holds or awaits the key.
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Holds one key of the engine's lock map; the entry is evicted once nobody else wants it.
struct KeyGuard<'a> {
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    key: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts as a holder.
        drop(self.guard.take());
        // Waiters hold a clone of the Arc, so a count of one means only the map refers to it.
        // `remove_if` runs under the shard lock that `lock` also takes to clone the Arc.
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl WalletEngine {
    /// Creates an engine over a store.
    #[must_use]
    pub fn new(store: Arc<dyn WalletStore>, config: WalletConfig) -> Self {
        Self {
            store,
            config,
            locks: DashMap::new(),
        }
    }

    /// Returns the business rules the engine runs with.
    #[must_use]
    pub fn config(&self) -> WalletConfig {
        self.config
    }

    /// Serializes work on one key (a wallet, reconciliation or shipper ID).
    async fn lock(&self, key: Uuid) -> KeyGuard<'_> {
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyGuard {
            locks: &self.locks,
            key,
            guard: Some(mutex.lock_owned().await),
        }
    }

    /// Attempt numbers for a commit loop: the first try plus the configured retries.
    fn attempts(&self) -> RangeInclusive<u32> {
        1..=self.config.max_commit_retries.saturating_add(1)
    }

    fn note_conflict(operation: &'static str, attempt: u32, err: &StoreError) {
        tracing::warn!(operation, attempt, error = %err, "Commit conflict, re-planning");
    }

    fn exhausted(&self, operation: &'static str) -> WalletError {
        tracing::warn!(
            operation,
            retries = self.config.max_commit_retries,
            "Commit retries exhausted"
        );
        WalletError::ConcurrentModification
    }

    async fn require_wallet(&self, owner_id: OwnerId) -> Result<WalletAccount, WalletError> {
        self.store
            .find_wallet_by_owner(owner_id)
            .await?
            .ok_or(WalletError::WalletNotFound(owner_id))
    }

    /// Reloads a wallet that is known to exist.
    async fn load_wallet(&self, wallet_id: WalletId) -> Result<WalletAccount, WalletError> {
        self.store
            .find_wallet(wallet_id)
            .await?
            .ok_or_else(|| WalletError::Storage(format!("wallet {wallet_id} disappeared")))
    }
}

/// Returns true for store errors that a fresh snapshot may resolve.
fn is_conflict(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::VersionConflict(_) | StoreError::StatusConflict(_)
    )
}
