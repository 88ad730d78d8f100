//! Core business logic for the marketplace data layer.
//!
//! Each module owns one concern: purchase history reads, the self-dealing
//! repair pass, the balance ledger, reviews, and catalog lookups. All
//! operations are async, take the database handle as their first argument,
//! and return [`crate::errors::Result`].

pub mod balance;
pub mod catalog;
pub mod inventory;
pub mod purchases;
pub mod repair;
pub mod reviews;

use crate::{
    entities::{Product, User},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, EntityTrait};

/// Fails with [`Error::NotFound`] unless the user exists.
pub(crate) async fn ensure_user<C>(db: &C, user_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "user",
            id: user_id,
        })?;
    Ok(())
}

/// Fails with [`Error::NotFound`] unless the product exists.
pub(crate) async fn ensure_product<C>(db: &C, product_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "product",
            id: product_id,
        })?;
    Ok(())
}
