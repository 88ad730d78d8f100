//! Account balance entity - Materialized running sum of a user's ledger.
//!
//! Invariant: `balance_cents` equals the sum of the user's `balance_tx`
//! amounts. Writes that would break this must roll back.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account balance database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account_balance")]
pub struct Model {
    /// User this balance belongs to; one row per user
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// Current balance in cents; equals the ledger sum
    pub balance_cents: i64,
}

/// Defines relationships between AccountBalance and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each balance row belongs to one user
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
