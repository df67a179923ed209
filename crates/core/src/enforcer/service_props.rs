//! Property-based tests for InvariantEnforcer.
//!
//! Random sequences of postings are applied the way the engine applies them; the ledger they
//! produce must replay to the projected balance and the wallet must stay consistent throughout.

use chrono::Utc;
use coffer_shared::types::{Money, OwnerId, WithdrawalId};
use proptest::prelude::*;

use crate::enforcer::posting::Posting;
use crate::enforcer::service::InvariantEnforcer;
use crate::error::WalletError;
use crate::ledger::{ReferenceCode, TransactionLedger, TransactionType, WalletTransaction};
use crate::wallet::{BankInfo, WalletAccount};

#[derive(Debug, Clone)]
enum Op {
    Credit(u64),
    Reserve(u64),
    Release(usize),
    Settle(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..1_000_000).prop_map(Op::Credit),
        (1u64..1_000_000).prop_map(Op::Reserve),
        any::<usize>().prop_map(Op::Release),
        any::<usize>().prop_map(Op::Settle),
    ]
}

fn commit(
    wallet: &mut WalletAccount,
    entries: &mut Vec<WalletTransaction>,
    posting: &Posting,
) -> Result<(), WalletError> {
    let plan = InvariantEnforcer::check(wallet, posting, Utc::now())?;
    *wallet = plan.wallet;
    wallet.version += 1;
    entries.extend(plan.entry);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Replay of the committed entries always equals the projected balance.
    #[test]
    fn prop_replay_equals_projection(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut wallet = WalletAccount::open(
            OwnerId::new(),
            BankInfo::new("VCB", "0123456789", "OWNER"),
            Utc::now(),
        ).unwrap();
        let mut entries = Vec::new();
        let mut reservations: Vec<(WithdrawalId, Money)> = Vec::new();
        let mut order = 0u32;

        for op in ops {
            match op {
                Op::Credit(amount) => {
                    order += 1;
                    let posting = Posting::credit(
                        TransactionType::OrderPayment,
                        Money::new(amount),
                        ReferenceCode::external(format!("ORD-{order}")).unwrap(),
                        "",
                    );
                    prop_assert!(commit(&mut wallet, &mut entries, &posting).is_ok());
                }
                Op::Reserve(amount) => {
                    let id = WithdrawalId::new();
                    let posting = Posting::reserve(
                        Money::new(amount),
                        ReferenceCode::withdrawal(id),
                        "",
                    );
                    match commit(&mut wallet, &mut entries, &posting) {
                        Ok(()) => reservations.push((id, Money::new(amount))),
                        Err(WalletError::InsufficientBalance { .. }) => {
                            prop_assert!(Money::new(amount) > wallet.balance);
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {other}"),
                    }
                }
                Op::Release(_) | Op::Settle(_) if reservations.is_empty() => {}
                Op::Release(index) => {
                    let (id, amount) = reservations.remove(index % reservations.len());
                    let posting = Posting::release(amount, ReferenceCode::withdrawal(id), "");
                    prop_assert!(commit(&mut wallet, &mut entries, &posting).is_ok());
                }
                Op::Settle(index) => {
                    let (id, amount) = reservations.remove(index % reservations.len());
                    let posting = Posting::settle(amount, ReferenceCode::withdrawal(id), "");
                    prop_assert!(commit(&mut wallet, &mut entries, &posting).is_ok());
                }
            }

            prop_assert!(wallet.invariant_holds());
        }

        let replayed = TransactionLedger::replay(wallet.id, &entries).unwrap();
        prop_assert_eq!(replayed, wallet.balance);
        prop_assert_eq!(wallet.last_sequence, i64::try_from(entries.len()).unwrap());

        let reserved = Money::try_sum(reservations.iter().map(|(_, amount)| *amount)).unwrap();
        prop_assert_eq!(reserved, wallet.pending_amount);
    }

    /// A reservation never succeeds for more than the available balance.
    #[test]
    fn prop_reserve_never_overdraws(balance in 0u64..1_000_000, amount in 1u64..2_000_000) {
        let mut wallet = WalletAccount::open(
            OwnerId::new(),
            BankInfo::new("VCB", "0123456789", "OWNER"),
            Utc::now(),
        ).unwrap();
        wallet.balance = Money::new(balance);
        wallet.total_earned = Money::new(balance);

        let posting = Posting::reserve(
            Money::new(amount),
            ReferenceCode::withdrawal(WithdrawalId::new()),
            "",
        );
        let result = InvariantEnforcer::check(&wallet, &posting, Utc::now());
        if amount > balance {
            let is_insufficient = matches!(result, Err(WalletError::InsufficientBalance { .. }));
            prop_assert!(is_insufficient);
        } else {
            let plan = result.unwrap();
            prop_assert_eq!(plan.wallet.balance, Money::new(balance - amount));
        }
    }
}
