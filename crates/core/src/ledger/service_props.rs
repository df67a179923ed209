//! Property-based tests for TransactionLedger.

use chrono::Utc;
use coffer_shared::types::{Money, OwnerId, SignedMoney};
use proptest::prelude::*;

use crate::ledger::entry::{ReferenceCode, TransactionType, WalletTransaction};
use crate::ledger::error::LedgerError;
use crate::ledger::service::TransactionLedger;
use crate::wallet::{BankInfo, WalletAccount};

/// Builds a valid ledger from positive credits.
fn build_ledger(amounts: &[u32]) -> (WalletAccount, Vec<WalletTransaction>) {
    let mut wallet = WalletAccount::open(
        OwnerId::new(),
        BankInfo::new("VCB", "0123456789", "OWNER"),
        Utc::now(),
    )
    .unwrap();
    let mut entries = Vec::new();
    for (index, amount) in amounts.iter().enumerate() {
        let entry = TransactionLedger::append(
            &wallet,
            TransactionType::OrderPayment,
            SignedMoney::new(i64::from(*amount)),
            ReferenceCode::external(format!("ORD-{index}")).unwrap(),
            "",
            Utc::now(),
        )
        .unwrap();
        wallet.balance = entry.balance_after;
        wallet.last_sequence = entry.sequence;
        entries.push(entry);
    }
    (wallet, entries)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Replaying a well-formed ledger yields the sum of its amounts.
    #[test]
    fn prop_replay_sums_amounts(amounts in prop::collection::vec(1u32..10_000_000, 0..40)) {
        let (wallet, entries) = build_ledger(&amounts);
        let expected: u64 = amounts.iter().map(|a| u64::from(*a)).sum();
        prop_assert_eq!(TransactionLedger::replay(wallet.id, &entries), Ok(Money::new(expected)));
    }

    /// Altering any entry's opening balance breaks replay.
    #[test]
    fn prop_tampered_chain_is_detected(
        amounts in prop::collection::vec(1u32..10_000_000, 2..20),
        victim in any::<prop::sample::Index>(),
        delta in 1u64..1_000,
    ) {
        let (wallet, mut entries) = build_ledger(&amounts);
        let index = victim.index(entries.len());
        let entry = &mut entries[index];
        entry.balance_before = Money::new(entry.balance_before.minor_units() + delta);
        entry.balance_after = Money::new(entry.balance_after.minor_units() + delta);

        let result = TransactionLedger::replay(wallet.id, &entries);
        let is_broken = matches!(result, Err(LedgerError::BrokenChain { .. }));
        prop_assert!(is_broken);
    }

    /// Dropping an entry from the middle is a sequence gap.
    #[test]
    fn prop_missing_entry_is_detected(
        amounts in prop::collection::vec(1u32..10_000_000, 3..20),
        victim in any::<prop::sample::Index>(),
    ) {
        let (wallet, mut entries) = build_ledger(&amounts);
        let index = 1 + victim.index(entries.len() - 2);
        entries.remove(index);

        let result = TransactionLedger::replay(wallet.id, &entries);
        let is_gap = matches!(result, Err(LedgerError::SequenceGap { .. }));
        prop_assert!(is_gap);
    }
}
