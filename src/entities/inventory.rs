//! Inventory entity - Per-seller stock of a product.
//!
//! Keyed by `(seller_id, product_id)`; a seller holds at most one row per
//! product. Quantity zero means listed but out of stock.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory")]
pub struct Model {
    /// Seller holding the stock
    #[sea_orm(primary_key, auto_increment = false)]
    pub seller_id: i64,
    /// Product being stocked
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: i64,
    /// Units on hand
    pub quantity: i32,
}

/// Defines relationships between Inventory and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each inventory row belongs to one seller
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SellerId",
        to = "super::user::Column::Id"
    )]
    Seller,
    /// Each inventory row belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
