//! Review and vote business logic for products and sellers.
//!
//! Product and seller reviews share validation (ratings run 1..=5) but
//! live in separate tables. Votes apply to product reviews only, one row
//! per (voter, review), value +1 or -1.

use crate::{
    entities::{ProductReview, ReviewVote, SellerReview, User, product_review, review_vote,
        seller_review},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};

/// Default row count for the recent review feeds.
pub const DEFAULT_RECENT_REVIEWS: u64 = 20;
/// Largest row count the recent review feeds will serve.
pub const MAX_RECENT_REVIEWS: u64 = 100;

fn validate_rating(rating: i16) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(Error::InvalidRating { rating })
    }
}

/// Creates a product review. Rating must be 1..=5 and both the author and
/// product must exist.
pub async fn create_product_review(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    rating: i16,
    body: String,
) -> Result<product_review::Model> {
    validate_rating(rating)?;
    super::ensure_user(db, user_id).await?;
    super::ensure_product(db, product_id).await?;

    let now = Utc::now();
    product_review::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product_id),
        rating: Set(rating),
        body: Set(body),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Replaces a review's rating and body, bumping `updated_at`.
pub async fn update_product_review(
    db: &DatabaseConnection,
    review_id: i64,
    rating: i16,
    body: String,
) -> Result<product_review::Model> {
    validate_rating(rating)?;

    let review = ProductReview::find_by_id(review_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "product review",
            id: review_id,
        })?;

    let mut active: product_review::ActiveModel = review.into();
    active.rating = Set(rating);
    active.body = Set(body);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Deletes a review and its votes. Returns false when no such review
/// existed.
pub async fn delete_product_review(db: &DatabaseConnection, review_id: i64) -> Result<bool> {
    let txn = db.begin().await?;
    // Votes reference the review, so they go first
    ReviewVote::delete_many()
        .filter(review_vote::Column::ReviewId.eq(review_id))
        .exec(&txn)
        .await?;
    let deleted = ProductReview::delete_by_id(review_id).exec(&txn).await?;
    txn.commit().await?;
    Ok(deleted.rows_affected > 0)
}

/// Creates a seller review. Users cannot review themselves.
pub async fn create_seller_review(
    db: &DatabaseConnection,
    user_id: i64,
    seller_id: i64,
    rating: i16,
    body: String,
) -> Result<seller_review::Model> {
    validate_rating(rating)?;
    if user_id == seller_id {
        return Err(Error::SelfReview { user_id });
    }
    super::ensure_user(db, user_id).await?;
    super::ensure_user(db, seller_id).await?;

    let now = Utc::now();
    seller_review::ActiveModel {
        user_id: Set(user_id),
        seller_id: Set(seller_id),
        rating: Set(rating),
        body: Set(body),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// A product review joined with its author's display name.
#[derive(Debug, Clone)]
pub struct ProductReviewView {
    pub review: product_review::Model,
    /// None if the author's account no longer exists
    pub reviewer_name: Option<String>,
}

/// A seller review joined with its author's display name.
#[derive(Debug, Clone)]
pub struct SellerReviewView {
    pub review: seller_review::Model,
    pub reviewer_name: Option<String>,
}

/// Latest reviews for a product, newest first, author names joined.
pub async fn recent_reviews_for_product(
    db: &DatabaseConnection,
    product_id: i64,
    limit: Option<u64>,
) -> Result<Vec<ProductReviewView>> {
    super::ensure_product(db, product_id).await?;
    let limit = limit
        .unwrap_or(DEFAULT_RECENT_REVIEWS)
        .clamp(1, MAX_RECENT_REVIEWS);

    let rows = ProductReview::find()
        .find_also_related(User)
        .filter(product_review::Column::ProductId.eq(product_id))
        .order_by_desc(product_review::Column::CreatedAt)
        .order_by_desc(product_review::Column::Id)
        .limit(limit)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(review, author)| ProductReviewView {
            review,
            reviewer_name: author.map(|u| u.full_name),
        })
        .collect())
}

/// Latest reviews of a seller, newest first, author names joined.
pub async fn recent_reviews_for_seller(
    db: &DatabaseConnection,
    seller_id: i64,
    limit: Option<u64>,
) -> Result<Vec<SellerReviewView>> {
    super::ensure_user(db, seller_id).await?;
    let limit = limit
        .unwrap_or(DEFAULT_RECENT_REVIEWS)
        .clamp(1, MAX_RECENT_REVIEWS);

    let rows = SellerReview::find()
        .find_also_related(User)
        .filter(seller_review::Column::SellerId.eq(seller_id))
        .order_by_desc(seller_review::Column::CreatedAt)
        .order_by_desc(seller_review::Column::Id)
        .limit(limit)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(review, author)| SellerReviewView {
            review,
            reviewer_name: author.map(|u| u.full_name),
        })
        .collect())
}

/// Aggregate review statistics for one product or seller.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSummary {
    pub review_count: i64,
    /// None when there are no reviews
    pub average_rating: Option<f64>,
    pub first_review_at: Option<DateTimeUtc>,
    pub last_review_at: Option<DateTimeUtc>,
}

type SummaryRow = (i64, Option<f64>, Option<DateTimeUtc>, Option<DateTimeUtc>);

/// Review statistics for a product.
pub async fn product_review_summary(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<ReviewSummary> {
    super::ensure_product(db, product_id).await?;

    let row: Option<SummaryRow> = ProductReview::find()
        .filter(product_review::Column::ProductId.eq(product_id))
        .select_only()
        .column_as(product_review::Column::Id.count(), "review_count")
        .column_as(
            Expr::expr(Func::avg(Expr::col(product_review::Column::Rating))),
            "average_rating",
        )
        .column_as(product_review::Column::CreatedAt.min(), "first_review_at")
        .column_as(product_review::Column::CreatedAt.max(), "last_review_at")
        .into_tuple()
        .one(db)
        .await?;

    Ok(summary_from_row(row))
}

/// Review statistics for a seller.
pub async fn seller_review_summary(
    db: &DatabaseConnection,
    seller_id: i64,
) -> Result<ReviewSummary> {
    super::ensure_user(db, seller_id).await?;

    let row: Option<SummaryRow> = SellerReview::find()
        .filter(seller_review::Column::SellerId.eq(seller_id))
        .select_only()
        .column_as(seller_review::Column::Id.count(), "review_count")
        .column_as(
            Expr::expr(Func::avg(Expr::col(seller_review::Column::Rating))),
            "average_rating",
        )
        .column_as(seller_review::Column::CreatedAt.min(), "first_review_at")
        .column_as(seller_review::Column::CreatedAt.max(), "last_review_at")
        .into_tuple()
        .one(db)
        .await?;

    Ok(summary_from_row(row))
}

fn summary_from_row(row: Option<SummaryRow>) -> ReviewSummary {
    let (review_count, average_rating, first_review_at, last_review_at) =
        row.unwrap_or((0, None, None, None));
    ReviewSummary {
        review_count,
        average_rating,
        first_review_at,
        last_review_at,
    }
}

/// Casts or re-casts a vote on a product review. Value must be +1 or -1;
/// re-casting overwrites the voter's existing row rather than stacking.
pub async fn cast_vote(
    db: &DatabaseConnection,
    review_id: i64,
    voter_id: i64,
    value: i16,
) -> Result<review_vote::Model> {
    if value != 1 && value != -1 {
        return Err(Error::InvalidVote { value });
    }
    if ProductReview::find_by_id(review_id).one(db).await?.is_none() {
        return Err(Error::NotFound {
            entity: "product review",
            id: review_id,
        });
    }
    super::ensure_user(db, voter_id).await?;

    match ReviewVote::find_by_id((review_id, voter_id)).one(db).await? {
        Some(existing) if existing.value == value => Ok(existing),
        Some(existing) => {
            let mut active: review_vote::ActiveModel = existing.into();
            active.value = Set(value);
            active.update(db).await.map_err(Into::into)
        }
        None => review_vote::ActiveModel {
            review_id: Set(review_id),
            voter_id: Set(voter_id),
            value: Set(value),
        }
        .insert(db)
        .await
        .map_err(Into::into),
    }
}

/// Removes a voter's vote. Returns false when there was none.
pub async fn retract_vote(
    db: &DatabaseConnection,
    review_id: i64,
    voter_id: i64,
) -> Result<bool> {
    let deleted = ReviewVote::delete_by_id((review_id, voter_id))
        .exec(db)
        .await?;
    Ok(deleted.rows_affected > 0)
}

/// Net vote score of a product review (upvotes minus downvotes).
pub async fn review_score(db: &DatabaseConnection, review_id: i64) -> Result<i64> {
    if ProductReview::find_by_id(review_id).one(db).await?.is_none() {
        return Err(Error::NotFound {
            entity: "product review",
            id: review_id,
        });
    }

    let total: Option<Option<i64>> = ReviewVote::find()
        .filter(review_vote::Column::ReviewId.eq(review_id))
        .select_only()
        .column_as(review_vote::Column::Value.sum(), "score")
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}
