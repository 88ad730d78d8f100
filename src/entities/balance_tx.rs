//! Balance transaction entity - Append-only ledger of balance changes.
//!
//! The ledger is the source of truth for user balances; `account_balance`
//! is only a projection of its running sum.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Balance transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "balance_tx")]
pub struct Model {
    /// Unique identifier for the ledger entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose balance changed
    pub user_id: i64,
    /// Signed change in cents (positive for top-ups, negative for spending)
    pub amount_cents: i64,
    /// When the change was recorded
    pub created_at: DateTimeUtc,
    /// Human-readable reason for the change
    pub note: String,
}

/// Defines relationships between BalanceTx and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each ledger entry belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
