//! Property-based tests for WithdrawalService.

use proptest::prelude::*;

use crate::error::WalletError;
use crate::withdrawal::service::WithdrawalService;
use crate::withdrawal::types::{WithdrawalAction, WithdrawalStatus};

/// Strategy for generating random WithdrawalStatus values.
fn arb_status() -> impl Strategy<Value = WithdrawalStatus> {
    prop_oneof![
        Just(WithdrawalStatus::Pending),
        Just(WithdrawalStatus::Approved),
        Just(WithdrawalStatus::Rejected),
        Just(WithdrawalStatus::Completed),
    ]
}

/// Strategy for generating random WithdrawalAction values.
fn arb_action() -> impl Strategy<Value = WithdrawalAction> {
    prop_oneof![
        Just(WithdrawalAction::Approve),
        Just(WithdrawalAction::Complete),
        Just(WithdrawalAction::Reject),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every action either lands on its target or fails with the exact attempted pair.
    #[test]
    fn prop_transition_agrees_with_table(from in arb_status(), action in arb_action()) {
        let target = action.target();
        match WithdrawalService::transition(from, action) {
            Ok(status) => {
                prop_assert_eq!(status, target);
                prop_assert!(WithdrawalService::is_valid_transition(from, target));
            }
            Err(WalletError::InvalidWithdrawalTransition { from: f, to }) => {
                prop_assert_eq!(f, from);
                prop_assert_eq!(to, target);
                prop_assert!(!WithdrawalService::is_valid_transition(from, target));
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// Terminal states accept no action.
    #[test]
    fn prop_terminal_states_are_final(action in arb_action()) {
        prop_assert!(WithdrawalService::transition(WithdrawalStatus::Rejected, action).is_err());
        prop_assert!(WithdrawalService::transition(WithdrawalStatus::Completed, action).is_err());
    }

    /// From PENDING, COMPLETED is only reachable through APPROVED and terminal states never change.
    #[test]
    fn prop_action_sequences_stay_on_the_table(actions in prop::collection::vec(arb_action(), 0..10)) {
        let mut status = WithdrawalStatus::Pending;
        for action in actions {
            let was_terminal = status.is_terminal();
            if let Ok(next) = WithdrawalService::transition(status, action) {
                prop_assert!(!was_terminal);
                if next == WithdrawalStatus::Completed {
                    prop_assert_eq!(status, WithdrawalStatus::Approved);
                }
                status = next;
            }
        }
    }

    /// Nothing ever returns to PENDING.
    #[test]
    fn prop_pending_is_never_a_target(from in arb_status()) {
        prop_assert!(!WithdrawalService::is_valid_transition(from, WithdrawalStatus::Pending));
    }
}
