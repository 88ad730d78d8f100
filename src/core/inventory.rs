//! Seller inventory reads.

use crate::{
    entities::{Inventory, Product, inventory, product},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};

/// One stocked product in a seller's inventory listing.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryLine {
    pub product_id: i64,
    pub product_name: String,
    pub price_cents: i64,
    pub available: bool,
    /// Units on hand; zero-stock rows stay listed
    pub quantity: i32,
}

/// The seller's stock joined with product details, ordered by product name.
pub async fn inventory_for_seller(
    db: &DatabaseConnection,
    seller_id: i64,
) -> Result<Vec<InventoryLine>> {
    super::ensure_user(db, seller_id).await?;

    let rows = Inventory::find()
        .find_also_related(Product)
        .filter(inventory::Column::SellerId.eq(seller_id))
        .order_by_asc(product::Column::Name)
        .order_by_asc(inventory::Column::ProductId)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(stock, product)| {
            product.map(|p| InventoryLine {
                product_id: p.id,
                product_name: p.name,
                price_cents: p.price_cents,
                available: p.available,
                quantity: stock.quantity,
            })
        })
        .collect())
}
