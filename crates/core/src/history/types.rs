//! Balance history rows.

use chrono::{DateTime, NaiveDate, Utc};
use coffer_shared::types::{BalanceHistoryId, Money, OwnerId, SignedMoney};
use serde::{Deserialize, Serialize};

/// One day of a shipper's cash position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipperBalanceHistory {
    /// Row ID.
    pub id: BalanceHistoryId,
    /// The shipper.
    pub shipper_id: OwnerId,
    /// The day.
    pub date: NaiveDate,
    /// Cash on hand at the start of the day.
    pub opening_balance: SignedMoney,
    /// Cash collected from customers.
    pub collected: Money,
    /// Cash handed in.
    pub deposited: Money,
    /// Bonus earned.
    pub bonus: Money,
    /// Cash on hand at the end of the day.
    pub final_balance: SignedMoney,
    /// When the row was recorded.
    pub created_at: DateTime<Utc>,
}
