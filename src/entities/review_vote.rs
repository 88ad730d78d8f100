//! Review vote entity - A helpfulness vote on a product review.
//!
//! Keyed by `(review_id, voter_id)` so each user gets one vote per review;
//! casting again overwrites the previous value.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review vote database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review_votes")]
pub struct Model {
    /// Review being voted on
    #[sea_orm(primary_key, auto_increment = false)]
    pub review_id: i64,
    /// User casting the vote
    #[sea_orm(primary_key, auto_increment = false)]
    pub voter_id: i64,
    /// Vote value: +1 (helpful) or -1 (unhelpful)
    pub value: i16,
}

/// Defines relationships between ReviewVote and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each vote belongs to one product review
    #[sea_orm(
        belongs_to = "super::product_review::Entity",
        from = "Column::ReviewId",
        to = "super::product_review::Column::Id"
    )]
    Review,
    /// Each vote belongs to one voter
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::VoterId",
        to = "super::user::Column::Id"
    )]
    Voter,
}

impl Related<super::product_review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Voter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
