//! Property-based tests for BalanceHistoryService.

use chrono::{Duration, NaiveDate, Utc};
use coffer_shared::types::{Money, OwnerId};
use proptest::prelude::*;

use crate::history::service::BalanceHistoryService;
use crate::history::types::ShipperBalanceHistory;

/// Strategy for one day's figures: (day gap, collected, deposited, bonus).
fn arb_day() -> impl Strategy<Value = (i64, u64, u64, u64)> {
    (1i64..5, 0u64..5_000_000, 0u64..5_000_000, 0u64..200_000)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Rows appended through `next_row` always form a continuous history whose last final
    /// balance is the running sum of every day's movement.
    #[test]
    fn prop_appended_history_is_continuous(days in prop::collection::vec(arb_day(), 1..30)) {
        let shipper = OwnerId::new();
        let mut date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rows: Vec<ShipperBalanceHistory> = Vec::new();
        let mut expected: i128 = 0;

        for (gap, collected, deposited, bonus) in days {
            date += Duration::days(gap);
            let row = BalanceHistoryService::next_row(
                rows.last(),
                shipper,
                date,
                Money::new(collected),
                Money::new(deposited),
                Money::new(bonus),
                Utc::now(),
            ).unwrap();
            expected += i128::from(collected) - i128::from(deposited) + i128::from(bonus);
            rows.push(row);
        }

        prop_assert!(BalanceHistoryService::verify_continuity(&rows).is_ok());
        let last = rows.last().unwrap();
        prop_assert_eq!(i128::from(last.final_balance.minor_units()), expected);
    }
}
