//! Catalog reads: product lookups, featured listings, wishlists.

use crate::{
    entities::{Product, ProductReview, Wish, product, product_review, wish},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{FromQueryResult, JoinType, QueryOrder, QuerySelect, RelationTrait, Set, prelude::*};

/// Largest row count the catalog listings will serve.
pub const MAX_CATALOG_ROWS: u64 = 100;

/// Fetches one product by id.
pub async fn get_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "product",
            id: product_id,
        })
}

/// A catalog row with its aggregated review stats.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct FeaturedProduct {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub review_count: i64,
    /// None when the product has no reviews
    pub average_rating: Option<f64>,
}

/// Available products with their review stats, ordered by id, bounded.
pub async fn featured_products(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<FeaturedProduct>> {
    Product::find()
        .filter(product::Column::Available.eq(true))
        .join(JoinType::LeftJoin, product::Relation::Reviews.def())
        .select_only()
        .column(product::Column::Id)
        .column(product::Column::Name)
        .column(product::Column::PriceCents)
        .column_as(product_review::Column::Id.count(), "review_count")
        .column_as(
            Expr::expr(Func::avg(Expr::col((
                ProductReview,
                product_review::Column::Rating,
            )))),
            "average_rating",
        )
        .group_by(product::Column::Id)
        .group_by(product::Column::Name)
        .group_by(product::Column::PriceCents)
        .order_by_asc(product::Column::Id)
        .limit(limit.clamp(1, MAX_CATALOG_ROWS))
        .into_model()
        .all(db)
        .await
        .map_err(Into::into)
}

/// The `k` most expensive available products, priciest first, ties broken
/// by id.
pub async fn top_expensive_products(
    db: &DatabaseConnection,
    k: u64,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::Available.eq(true))
        .order_by_desc(product::Column::PriceCents)
        .order_by_asc(product::Column::Id)
        .limit(k.clamp(1, MAX_CATALOG_ROWS))
        .all(db)
        .await
        .map_err(Into::into)
}

/// The user's wishlist entries, newest first.
pub async fn wishlist_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<wish::Model>> {
    super::ensure_user(db, user_id).await?;
    Wish::find()
        .filter(wish::Column::UserId.eq(user_id))
        .order_by_desc(wish::Column::TimeAdded)
        .order_by_desc(wish::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a product to the user's wishlist.
pub async fn add_wish(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
) -> Result<wish::Model> {
    super::ensure_user(db, user_id).await?;
    super::ensure_product(db, product_id).await?;

    wish::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product_id),
        time_added: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}
