//! User entity - Represents a marketplace account.
//!
//! Every user can act as both buyer and seller; there is no separate seller
//! table. Sellers are simply users who hold inventory.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login email, unique across the marketplace
    #[sea_orm(unique)]
    pub email: String,
    /// Display name shown alongside orders and reviews
    pub full_name: String,
    /// Shipping address
    pub address: String,
    /// Hashed password; never stored or compared in plaintext
    pub password_hash: String,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user places many orders (as buyer)
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    /// One user holds many inventory rows (as seller)
    #[sea_orm(has_many = "super::inventory::Entity")]
    Inventory,
    /// One user accrues many ledger entries
    #[sea_orm(has_many = "super::balance_tx::Entity")]
    BalanceEntries,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl Related<super::balance_tx::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BalanceEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
