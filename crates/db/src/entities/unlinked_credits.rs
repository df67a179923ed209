//! `SeaORM` Entity for unlinked_credits table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "unlinked_credits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub transaction_type: String,
    pub amount: i64,
    pub reference_code: String,
    pub description: String,
    pub source: String,
    pub created_at: DateTimeWithTimeZone,
    pub linked_at: Option<DateTimeWithTimeZone>,
    pub linked_transaction_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
