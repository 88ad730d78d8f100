//! Seller review entity - A buyer's rating of a seller they dealt with.
//!
//! Reviewer and seller are both users; a user may not review themselves.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Seller review database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seller_reviews")]
pub struct Model {
    /// Unique identifier for the review
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who wrote the review
    pub user_id: i64,
    /// Seller being reviewed
    pub seller_id: i64,
    /// Star rating, 1 through 5
    pub rating: i16,
    /// Review text
    pub body: String,
    /// When the review was first posted
    pub created_at: DateTimeUtc,
    /// When the review was last edited
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between SellerReview and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each review belongs to one author
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Reviewer,
    /// Each review targets one seller
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SellerId",
        to = "super::user::Column::Id"
    )]
    Seller,
}

// Joins default to the author; target the seller with `Relation::Seller.def()`.
impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviewer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
