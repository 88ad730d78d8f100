//! Order entity - A buyer's checkout, grouping one or more order items.
//!
//! `total_cents` is the sum of `quantity * unit_price_cents` over the order's
//! items, frozen at checkout time. `fulfilled` flips once every item has a
//! `fulfilled_at` timestamp.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who placed the order
    pub buyer_id: i64,
    /// When the order was placed; purchase history sorts on this
    pub created_at: DateTimeUtc,
    /// Order total in cents, frozen at checkout
    pub total_cents: i64,
    /// Whether every item in the order has been fulfilled
    pub fulfilled: bool,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one buyer
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::BuyerId",
        to = "super::user::Column::Id"
    )]
    Buyer,
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buyer.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
