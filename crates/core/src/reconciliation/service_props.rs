//! Property-based tests for ReconciliationService.

use chrono::{NaiveDate, Utc};
use coffer_shared::types::{Money, OwnerId};
use proptest::prelude::*;

use crate::reconciliation::service::ReconciliationService;
use crate::reconciliation::types::{CodReconciliation, ReconciliationStatus};

fn arb_status() -> impl Strategy<Value = ReconciliationStatus> {
    prop_oneof![
        Just(ReconciliationStatus::Pending),
        Just(ReconciliationStatus::Processing),
        Just(ReconciliationStatus::Done),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// `advance` only ever takes a step the transition table allows.
    #[test]
    fn prop_advance_follows_table(from in arb_status()) {
        match ReconciliationService::advance(from) {
            Ok(to) => prop_assert!(ReconciliationService::is_valid_transition(from, to)),
            Err(_) => prop_assert_eq!(from, ReconciliationStatus::Done),
        }
    }

    /// The difference is always deposited minus collected, before and after edits.
    #[test]
    fn prop_difference_is_deposited_minus_collected(
        collected in 0u64..10_000_000_000,
        deposited in 0u64..10_000_000_000,
        new_collected in 0u64..10_000_000_000,
        new_deposited in 0u64..10_000_000_000,
    ) {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rec = CodReconciliation::new(
            OwnerId::new(),
            date,
            Money::new(collected),
            Money::new(deposited),
            Utc::now(),
        ).unwrap();
        prop_assert_eq!(
            i128::from(rec.difference.minor_units()),
            i128::from(deposited) - i128::from(collected)
        );

        let updated = ReconciliationService::update_totals(
            &rec,
            Money::new(new_collected),
            Money::new(new_deposited),
            Utc::now(),
        ).unwrap();
        prop_assert_eq!(
            i128::from(updated.difference.minor_units()),
            i128::from(new_deposited) - i128::from(new_collected)
        );
    }

    /// The settlement credit equals the deposit, and is absent only for a zero deposit.
    #[test]
    fn prop_settlement_amount_is_deposit(deposited in 0u64..10_000_000_000) {
        let rec = CodReconciliation::new(
            OwnerId::new(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            Money::new(deposited),
            Money::new(deposited),
            Utc::now(),
        ).unwrap();
        match ReconciliationService::settlement_posting(&rec, Money::ZERO).unwrap() {
            Some(posting) => prop_assert_eq!(posting.amount(), Money::new(deposited)),
            None => prop_assert_eq!(deposited, 0),
        }
    }
}
