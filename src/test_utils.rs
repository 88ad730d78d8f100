//! Shared test utilities for the Bazaar data layer.
//!
//! Helpers for spinning up an in-memory database and building marketplace
//! fixtures (users, products, orders, stock) with sensible defaults.

use crate::{entities, errors::Result};
use sea_orm::{DatabaseConnection, Set, prelude::*};

/// Creates an in-memory `SQLite` database with all tables and indexes
/// initialized. This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    crate::config::database::create_indexes(&db).await?;
    Ok(db)
}

/// Parses a `YYYY-MM-DD HH:MM:SS` literal into a fixture timestamp.
///
/// # Panics
/// Panics on a malformed literal, which in a test is the bug.
#[must_use]
#[allow(clippy::expect_used)]
pub fn ts(value: &str) -> DateTimeUtc {
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .expect("malformed test timestamp")
        .and_utc()
}

/// Creates a test user with sensible defaults.
///
/// # Arguments
/// * `db` - Database connection
/// * `email` - Account email, must be unique per test database
/// * `full_name` - Display name
///
/// # Defaults
/// * `address`: "123 Test Lane"
/// * `password_hash`: a fixed placeholder hash
/// * `created_at`: 2024-01-01 00:00:00 UTC
pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
    full_name: &str,
) -> Result<entities::user::Model> {
    entities::user::ActiveModel {
        email: Set(email.to_string()),
        full_name: Set(full_name.to_string()),
        address: Set("123 Test Lane".to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        created_at: Set(ts("2024-01-01 00:00:00")),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates an available test product with no description.
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    price_cents: i64,
) -> Result<entities::product::Model> {
    create_custom_product(db, name, price_cents, true).await
}

/// Creates a test product with explicit availability.
/// Use this when a test needs hidden catalog rows.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    name: &str,
    price_cents: i64,
    available: bool,
) -> Result<entities::product::Model> {
    entities::product::ActiveModel {
        name: Set(name.to_string()),
        price_cents: Set(price_cents),
        available: Set(available),
        description: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a test order for a buyer.
///
/// # Arguments
/// * `db` - Database connection
/// * `buyer_id` - Must reference an existing user
/// * `placed_at` - `YYYY-MM-DD HH:MM:SS` literal for `created_at`
/// * `total_cents` - Stored order total
/// * `fulfilled` - Fulfillment flag
pub async fn create_test_order(
    db: &DatabaseConnection,
    buyer_id: i64,
    placed_at: &str,
    total_cents: i64,
    fulfilled: bool,
) -> Result<entities::order::Model> {
    entities::order::ActiveModel {
        buyer_id: Set(buyer_id),
        created_at: Set(ts(placed_at)),
        total_cents: Set(total_cents),
        fulfilled: Set(fulfilled),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Adds an unfulfilled line item to an order.
pub async fn add_order_item(
    db: &DatabaseConnection,
    order_id: i64,
    product_id: i64,
    seller_id: i64,
    quantity: i32,
    unit_price_cents: i64,
) -> Result<entities::order_item::Model> {
    entities::order_item::ActiveModel {
        order_id: Set(order_id),
        product_id: Set(product_id),
        seller_id: Set(seller_id),
        quantity: Set(quantity),
        unit_price_cents: Set(unit_price_cents),
        fulfilled_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Records a seller's stock of a product. Each (seller, product) pair may
/// only be set once per test database.
pub async fn set_stock(
    db: &DatabaseConnection,
    seller_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<entities::inventory::Model> {
    entities::inventory::ActiveModel {
        seller_id: Set(seller_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}
