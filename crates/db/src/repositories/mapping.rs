//! Conversions between `SeaORM` models and domain types.
//!
//! Amounts are stored as `BIGINT` minor units. A stored value that does not convert back
//! (a negative `Money`, an unknown status) is reported as a backend error rather than coerced.

use chrono::{DateTime, Utc};
use coffer_core::history::ShipperBalanceHistory;
use coffer_core::ledger::{ReferenceCode, TransactionType, WalletTransaction};
use coffer_core::reconciliation::{CodReconciliation, ReconciliationStatus};
use coffer_core::settlement::{CreditSource, UnlinkedCredit};
use coffer_core::store::StoreError;
use coffer_core::wallet::{BankInfo, WalletAccount};
use coffer_core::withdrawal::{WithdrawalRequest, WithdrawalStatus};
use coffer_shared::types::{
    BalanceHistoryId, Money, OwnerId, ReconciliationId, SignedMoney, UnlinkedCreditId, WalletId,
    WalletTransactionId, WithdrawalId,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DbErr, SqlErr};

use crate::entities::{
    cod_reconciliations, shipper_balance_history, unlinked_credits, wallet_transactions, wallets,
    withdrawal_requests,
};

// ========== Errors ==========

pub(crate) fn db_err(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Returns the constraint message if `err` is a unique violation.
pub(crate) fn unique_violation(err: &DbErr) -> Option<String> {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => Some(message),
        _ => None,
    }
}

fn corrupt(column: &str, value: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("stored {column} is invalid: {value}"))
}

// ========== Scalars ==========

pub(crate) fn money(column: &str, value: i64) -> Result<Money, StoreError> {
    Money::try_from(value).map_err(|_| corrupt(column, value))
}

pub(crate) fn minor_units(value: Money) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::Backend(format!("amount {value} exceeds the storage range")))
}

pub(crate) fn utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn transaction_type(value: &str) -> Result<TransactionType, StoreError> {
    TransactionType::parse(value).ok_or_else(|| corrupt("transaction_type", value))
}

// ========== Models ==========

pub(crate) fn wallet(model: wallets::Model) -> Result<WalletAccount, StoreError> {
    Ok(WalletAccount {
        id: WalletId::from_uuid(model.id),
        owner_id: OwnerId::from_uuid(model.owner_id),
        bank: BankInfo {
            bank_name: model.bank_name,
            bank_account_number: model.bank_account_number,
            bank_account_name: model.bank_account_name,
        },
        is_active: model.is_active,
        balance: money("balance", model.balance)?,
        pending_amount: money("pending_amount", model.pending_amount)?,
        total_earned: money("total_earned", model.total_earned)?,
        total_withdrawn: money("total_withdrawn", model.total_withdrawn)?,
        version: model.version,
        last_sequence: model.last_sequence,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn entry(model: wallet_transactions::Model) -> Result<WalletTransaction, StoreError> {
    Ok(WalletTransaction {
        id: WalletTransactionId::from_uuid(model.id),
        wallet_id: WalletId::from_uuid(model.wallet_id),
        sequence: model.sequence,
        transaction_type: transaction_type(&model.transaction_type)?,
        amount: SignedMoney::new(model.amount),
        balance_before: money("balance_before", model.balance_before)?,
        balance_after: money("balance_after", model.balance_after)?,
        description: model.description,
        reference_code: ReferenceCode::from_stored(model.reference_code),
        created_at: utc(model.created_at),
    })
}

pub(crate) fn withdrawal(
    model: withdrawal_requests::Model,
) -> Result<WithdrawalRequest, StoreError> {
    Ok(WithdrawalRequest {
        id: WithdrawalId::from_uuid(model.id),
        wallet_id: WalletId::from_uuid(model.wallet_id),
        owner_id: OwnerId::from_uuid(model.owner_id),
        amount: money("amount", model.amount)?,
        bank: BankInfo {
            bank_name: model.bank_name,
            bank_account_number: model.bank_account_number,
            bank_account_name: model.bank_account_name,
        },
        note: model.note,
        admin_note: model.admin_note,
        status: WithdrawalStatus::parse(&model.status)
            .ok_or_else(|| corrupt("withdrawal status", &model.status))?,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
        processed_at: model.processed_at.map(utc),
    })
}

pub(crate) fn reconciliation(
    model: cod_reconciliations::Model,
) -> Result<CodReconciliation, StoreError> {
    Ok(CodReconciliation {
        id: ReconciliationId::from_uuid(model.id),
        shipper_id: OwnerId::from_uuid(model.shipper_id),
        date: model.date,
        status: ReconciliationStatus::parse(&model.status)
            .ok_or_else(|| corrupt("reconciliation status", &model.status))?,
        corrects: model.corrects.map(ReconciliationId::from_uuid),
        total_collected: money("total_collected", model.total_collected)?,
        total_deposited: money("total_deposited", model.total_deposited)?,
        difference: SignedMoney::new(model.difference),
        settlement_transaction_id: model
            .settlement_transaction_id
            .map(WalletTransactionId::from_uuid),
        unlinked_credit_id: model.unlinked_credit_id.map(UnlinkedCreditId::from_uuid),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
        completed_at: model.completed_at.map(utc),
        version: model.version,
    })
}

pub(crate) fn unlinked_credit(
    model: unlinked_credits::Model,
) -> Result<UnlinkedCredit, StoreError> {
    Ok(UnlinkedCredit {
        id: UnlinkedCreditId::from_uuid(model.id),
        owner_id: OwnerId::from_uuid(model.owner_id),
        transaction_type: transaction_type(&model.transaction_type)?,
        amount: money("amount", model.amount)?,
        reference_code: ReferenceCode::from_stored(model.reference_code),
        description: model.description,
        source: CreditSource::parse(&model.source).ok_or_else(|| corrupt("source", &model.source))?,
        created_at: utc(model.created_at),
        linked_at: model.linked_at.map(utc),
        linked_transaction_id: model.linked_transaction_id.map(WalletTransactionId::from_uuid),
    })
}

pub(crate) fn balance_history(
    model: shipper_balance_history::Model,
) -> Result<ShipperBalanceHistory, StoreError> {
    Ok(ShipperBalanceHistory {
        id: BalanceHistoryId::from_uuid(model.id),
        shipper_id: OwnerId::from_uuid(model.shipper_id),
        date: model.date,
        opening_balance: SignedMoney::new(model.opening_balance),
        collected: money("collected", model.collected)?,
        deposited: money("deposited", model.deposited)?,
        bonus: money("bonus", model.bonus)?,
        final_balance: SignedMoney::new(model.final_balance),
        created_at: utc(model.created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use uuid::Uuid;

    fn timestamp() -> DateTimeWithTimeZone {
        Utc::now().with_timezone(&FixedOffset::east_opt(7 * 3600).unwrap())
    }

    fn wallet_model() -> wallets::Model {
        wallets::Model {
            id: Uuid::now_v7(),
            owner_id: Uuid::now_v7(),
            bank_name: "Vietcombank".to_string(),
            bank_account_number: "0011004455667".to_string(),
            bank_account_name: "NGUYEN VAN A".to_string(),
            is_active: true,
            balance: 100_000,
            pending_amount: 50_000,
            total_earned: 150_000,
            total_withdrawn: 0,
            version: 3,
            last_sequence: 2,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    #[test]
    fn test_wallet_model_converts() {
        let model = wallet_model();
        let wallet = wallet(model.clone()).unwrap();
        assert_eq!(wallet.id.into_inner(), model.id);
        assert_eq!(wallet.balance, Money::new(100_000));
        assert_eq!(wallet.created_at, model.created_at.with_timezone(&Utc));
        assert!(wallet.invariant_holds());
    }

    #[test]
    fn test_negative_stored_amount_is_reported() {
        let model = wallets::Model {
            balance: -1,
            ..wallet_model()
        };
        assert!(matches!(wallet(model), Err(StoreError::Backend(_))));
    }

    #[test]
    fn test_unknown_status_is_reported() {
        let model = withdrawal_requests::Model {
            id: Uuid::now_v7(),
            wallet_id: Uuid::now_v7(),
            owner_id: Uuid::now_v7(),
            amount: 60_000,
            bank_name: "Vietcombank".to_string(),
            bank_account_number: "0011004455667".to_string(),
            bank_account_name: "NGUYEN VAN A".to_string(),
            note: None,
            admin_note: None,
            status: "CANCELLED".to_string(),
            created_at: timestamp(),
            updated_at: timestamp(),
            processed_at: None,
        };
        let err = withdrawal(model).unwrap_err();
        assert!(matches!(err, StoreError::Backend(message) if message.contains("CANCELLED")));
    }

    #[test]
    fn test_amount_beyond_bigint_is_rejected() {
        assert!(minor_units(Money::new(u64::MAX)).is_err());
        assert_eq!(minor_units(Money::new(42)).unwrap(), 42);
    }
}
