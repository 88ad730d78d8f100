//! Database configuration module for the marketplace data layer.
//!
//! This module handles database connection, table creation, and index creation
//! using `SeaORM`. Tables are generated from the entity definitions via
//! `Schema::create_table_from_entity`, so the database schema always matches
//! the Rust struct definitions without requiring manual SQL. Secondary indexes
//! back the hot query paths (purchase history, repair scans, ledger sums) and
//! are created separately since they are not part of the entity definitions.

use crate::entities::{
    AccountBalance, BalanceTx, Inventory, Order, OrderItem, Product, ProductReview, Purchase,
    ReviewVote, SellerReview, User, Wish, balance_tx, order, order_item,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement, IndexOrder};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
pub fn get_database_url() -> Result<String> {
    Ok(std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/bazaar.sqlite".to_string()))
}

/// Establishes a connection to the database using the `DATABASE_URL` environment variable.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
/// This function handles connection errors and provides a clean interface for database access
/// throughout the application.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url()?;

    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Tables are created in foreign-key dependency order so referenced tables
/// exist before the rows that point at them. Safe to call on an existing
/// database; every statement carries `IF NOT EXISTS`.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Referenced tables first: users and products before everything keyed on them,
    // orders before order_items, product_reviews before review_votes.
    let tables = [
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Product),
        schema.create_table_from_entity(Inventory),
        schema.create_table_from_entity(Order),
        schema.create_table_from_entity(OrderItem),
        schema.create_table_from_entity(BalanceTx),
        schema.create_table_from_entity(AccountBalance),
        schema.create_table_from_entity(ProductReview),
        schema.create_table_from_entity(SellerReview),
        schema.create_table_from_entity(ReviewVote),
        schema.create_table_from_entity(Purchase),
        schema.create_table_from_entity(Wish),
    ];

    for mut table in tables {
        table.if_not_exists();
        db.execute(builder.build(&table)).await?;
    }

    Ok(())
}

/// Creates the secondary indexes behind the hot query paths.
///
/// Purchase history pages on `orders (buyer_id, created_at DESC)`, order
/// detail and the repair scan hit `order_items` by order and by seller, and
/// ledger verification sums `balance_tx` by user. Name search uses an
/// expression index on `lower(name)`, issued as raw SQL since the index
/// builder only takes plain columns.
pub async fn create_indexes(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();

    let indexes: [IndexCreateStatement; 5] = [
        Index::create()
            .name("idx_orders_buyer_created")
            .table(Order)
            .col(order::Column::BuyerId)
            .col((order::Column::CreatedAt, IndexOrder::Desc))
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_orders_created")
            .table(Order)
            .col(order::Column::CreatedAt)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_order_items_order")
            .table(OrderItem)
            .col(order_item::Column::OrderId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_order_items_seller")
            .table(OrderItem)
            .col(order_item::Column::SellerId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_balance_tx_user")
            .table(BalanceTx)
            .col(balance_tx::Column::UserId)
            .if_not_exists()
            .to_owned(),
    ];

    for index in &indexes {
        db.execute(builder.build(index)).await?;
    }

    db.execute_unprepared(
        "CREATE INDEX IF NOT EXISTS idx_products_name_lower ON products (lower(name))",
    )
    .await?;

    Ok(())
}
