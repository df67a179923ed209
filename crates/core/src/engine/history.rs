//! Shipper balance history.

use chrono::{NaiveDate, Utc};
use coffer_shared::types::{Money, OwnerId};

use super::{WalletEngine, is_conflict};
use crate::error::WalletError;
use crate::history::{BalanceHistoryService, ShipperBalanceHistory};
use crate::store::StoreError;

impl WalletEngine {
    /// Appends a day to a shipper's balance history.
    ///
    /// # Errors
    ///
    /// - `DuplicateBalanceHistory` if the day is already recorded
    /// - `BalanceHistoryOutOfOrder` if a later day is already recorded
    /// - `AmountOverflow` if the final balance does not fit
    pub async fn record_balance_history(
        &self,
        shipper_id: OwnerId,
        date: NaiveDate,
        collected: Money,
        deposited: Money,
        bonus: Money,
    ) -> Result<ShipperBalanceHistory, WalletError> {
        let _guard = self.lock(shipper_id.into_inner()).await;

        for attempt in self.attempts() {
            let latest = self.store.latest_balance_history(shipper_id).await?;
            let row = BalanceHistoryService::next_row(
                latest.as_ref(),
                shipper_id,
                date,
                collected,
                deposited,
                bonus,
                Utc::now(),
            )?;

            match self
                .store
                .insert_balance_history(&row, latest.as_ref().map(|latest| latest.id))
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        %shipper_id,
                        %date,
                        opening_balance = %row.opening_balance,
                        final_balance = %row.final_balance,
                        "Balance history recorded"
                    );
                    return Ok(row);
                }
                Err(StoreError::Duplicate(_)) => {
                    return Err(WalletError::DuplicateBalanceHistory { shipper_id, date });
                }
                Err(err) if is_conflict(&err) => {
                    Self::note_conflict("record_balance_history", attempt, &err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("record_balance_history"))
    }

    /// Returns a shipper's rows between two days (inclusive), ascending by date.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    pub async fn balance_history(
        &self,
        shipper_id: OwnerId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ShipperBalanceHistory>, WalletError> {
        Ok(self
            .store
            .list_balance_history(shipper_id, from, to)
            .await?)
    }
}
