//! `SeaORM` Entity for wallets table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub owner_id: Uuid,
    pub bank_name: String,
    pub bank_account_number: String,
    pub bank_account_name: String,
    pub is_active: bool,
    pub balance: i64,
    pub pending_amount: i64,
    pub total_earned: i64,
    pub total_withdrawn: i64,
    pub version: i64,
    pub last_sequence: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::wallet_transactions::Entity")]
    WalletTransactions,
    #[sea_orm(has_many = "super::withdrawal_requests::Entity")]
    WithdrawalRequests,
}

impl Related<super::wallet_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalletTransactions.def()
    }
}

impl Related<super::withdrawal_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WithdrawalRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
