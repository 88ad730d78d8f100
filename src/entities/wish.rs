//! Wish entity - An item on a user's wishlist.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wish database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wishes")]
pub struct Model {
    /// Unique identifier for the wish
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who wishes for the product
    pub user_id: i64,
    /// Product wished for
    pub product_id: i64,
    /// When the product was added to the wishlist
    pub time_added: DateTimeUtc,
}

/// Defines relationships between Wish and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each wish belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each wish belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
