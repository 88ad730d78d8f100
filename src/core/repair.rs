//! Repair pass for orders that recorded the buyer as their own seller.
//!
//! An old checkout bug could route a line item through the buyer's own
//! inventory listing, leaving `order_items.seller_id` equal to the order's
//! buyer. The repair reassigns each such item to a real seller who stocks
//! the product, inside a single transaction per buyer. Inventory counts and
//! prices are never touched: the order already happened, only the seller
//! attribution was wrong.

use crate::{
    entities::{Inventory, Order, OrderItem, inventory, order, order_item},
    errors::{Error, Result},
};
use sea_orm::sea_query::Expr;
use sea_orm::{JoinType, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument, warn};

/// One line item moved off the buyer's own listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignedItem {
    pub order_item_id: i64,
    pub product_id: i64,
    /// Seller recorded before the repair; always the order's buyer
    pub previous_seller_id: i64,
    pub new_seller_id: i64,
    /// Stock the new seller held when selected
    pub new_seller_stock: i32,
}

/// A self-dealing line item no other seller could take over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedItem {
    pub order_item_id: i64,
    pub product_id: i64,
}

/// Result of one repair pass over a buyer's orders.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub buyer_id: i64,
    pub reassigned: Vec<ReassignedItem>,
    /// Items still self-dealing because no eligible seller exists
    pub unresolved: Vec<UnresolvedItem>,
}

impl RepairOutcome {
    /// True when the pass found nothing to fix and left nothing broken.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.reassigned.is_empty() && self.unresolved.is_empty()
    }
}

/// Line items on the buyer's orders where the buyer is recorded as seller.
async fn find_self_dealing_items<C: ConnectionTrait>(
    db: &C,
    buyer_id: i64,
) -> Result<Vec<order_item::Model>> {
    OrderItem::find()
        .join(JoinType::InnerJoin, order_item::Relation::Order.def())
        .filter(order::Column::BuyerId.eq(buyer_id))
        .filter(order_item::Column::SellerId.eq(buyer_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Ids of every buyer with at least one self-dealing line item, ascending.
pub async fn find_self_dealing_buyers(db: &DatabaseConnection) -> Result<Vec<i64>> {
    Order::find()
        .join(JoinType::InnerJoin, order::Relation::Items.def())
        .filter(
            Expr::col((Order, order::Column::BuyerId))
                .equals((OrderItem, order_item::Column::SellerId)),
        )
        .select_only()
        .column(order::Column::BuyerId)
        .distinct()
        .order_by_asc(order::Column::BuyerId)
        .into_tuple::<i64>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Picks the replacement seller for a product: anyone but the buyer with
/// stock on hand, preferring the deepest stock, then the lowest seller id
/// so reruns pick the same row.
async fn select_candidate_seller<C: ConnectionTrait>(
    db: &C,
    product_id: i64,
    buyer_id: i64,
) -> Result<Option<inventory::Model>> {
    Inventory::find()
        .filter(inventory::Column::ProductId.eq(product_id))
        .filter(inventory::Column::SellerId.ne(buyer_id))
        .filter(inventory::Column::Quantity.gt(0))
        .order_by_desc(inventory::Column::Quantity)
        .order_by_asc(inventory::Column::SellerId)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Reassigns one self-dealing item to the selected seller. The selection
/// predicate already encodes eligibility, so the first match is written
/// as-is.
async fn repair_order_item<C: ConnectionTrait>(
    db: &C,
    item: &order_item::Model,
    buyer_id: i64,
) -> Result<ReassignedItem> {
    let candidate = select_candidate_seller(db, item.product_id, buyer_id)
        .await?
        .ok_or(Error::UnresolvableSeller {
            order_item_id: item.id,
            product_id: item.product_id,
        })?;

    let mut active: order_item::ActiveModel = item.clone().into();
    active.seller_id = Set(candidate.seller_id);
    let updated = active.update(db).await?;

    Ok(ReassignedItem {
        order_item_id: updated.id,
        product_id: updated.product_id,
        previous_seller_id: buyer_id,
        new_seller_id: candidate.seller_id,
        new_seller_stock: candidate.quantity,
    })
}

/// Repairs every self-dealing line item on one buyer's orders.
///
/// Runs as a single transaction: either all resolvable items move to their
/// new sellers or none do. Items with no eligible seller are reported in
/// the outcome and left in place, which makes a second pass over the same
/// buyer a no-op apart from re-reporting them.
#[instrument(skip(db))]
pub async fn repair_self_dealing(
    db: &DatabaseConnection,
    buyer_id: i64,
) -> Result<RepairOutcome> {
    super::ensure_user(db, buyer_id).await?;

    let txn = db.begin().await?;

    let items = find_self_dealing_items(&txn, buyer_id).await?;
    let mut reassigned = Vec::new();
    let mut unresolved = Vec::new();

    for item in &items {
        match repair_order_item(&txn, item, buyer_id).await {
            Ok(change) => {
                debug!(
                    "Reassigned order item {} (product {}) to seller {}",
                    change.order_item_id, change.product_id, change.new_seller_id
                );
                reassigned.push(change);
            }
            Err(Error::UnresolvableSeller {
                order_item_id,
                product_id,
            }) => {
                warn!(
                    "No eligible seller for order item {} (product {})",
                    order_item_id, product_id
                );
                unresolved.push(UnresolvedItem {
                    order_item_id,
                    product_id,
                });
            }
            Err(e) => return Err(e),
        }
    }

    txn.commit().await?;

    info!(
        "Repair for buyer {}: {} reassigned, {} unresolved",
        buyer_id,
        reassigned.len(),
        unresolved.len()
    );

    Ok(RepairOutcome {
        buyer_id,
        reassigned,
        unresolved,
    })
}

/// Formats a repair outcome as a human-readable report.
#[must_use]
pub fn format_repair_summary(outcome: &RepairOutcome) -> String {
    use std::fmt::Write;

    let mut summary = String::new();
    // write! is infallible when writing to String, so unwrap is safe
    if outcome.is_clean() {
        write!(
            summary,
            "Self-dealing repair for buyer {}: nothing to repair",
            outcome.buyer_id
        )
        .unwrap();
        return summary;
    }

    writeln!(
        summary,
        "Self-dealing repair for buyer {}: {} reassigned, {} unresolved",
        outcome.buyer_id,
        outcome.reassigned.len(),
        outcome.unresolved.len()
    )
    .unwrap();
    for change in &outcome.reassigned {
        writeln!(
            summary,
            "  item {} (product {}): seller {} -> seller {} (stock {})",
            change.order_item_id,
            change.product_id,
            change.previous_seller_id,
            change.new_seller_id,
            change.new_seller_stock
        )
        .unwrap();
    }
    for item in &outcome.unresolved {
        writeln!(
            summary,
            "  item {} (product {}): no eligible seller",
            item.order_item_id, item.product_id
        )
        .unwrap();
    }
    summary
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_repair_prefers_seller_with_highest_stock() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "buyer@example.com", "Buyer").await?;
        let low = create_test_user(&db, "low@example.com", "Low Stock").await?;
        let high = create_test_user(&db, "high@example.com", "High Stock").await?;
        let product = create_test_product(&db, "Lantern", 1500).await?;
        set_stock(&db, low.id, product.id, 5).await?;
        set_stock(&db, high.id, product.id, 9).await?;

        let order = create_test_order(&db, buyer.id, "2024-05-01 00:00:00", 1500, true).await?;
        let item = add_order_item(&db, order.id, product.id, buyer.id, 1, 1500).await?;

        let outcome = repair_self_dealing(&db, buyer.id).await?;
        assert_eq!(outcome.buyer_id, buyer.id);
        assert!(outcome.unresolved.is_empty());
        assert_eq!(outcome.reassigned.len(), 1);
        assert_eq!(outcome.reassigned[0].order_item_id, item.id);
        assert_eq!(outcome.reassigned[0].previous_seller_id, buyer.id);
        assert_eq!(outcome.reassigned[0].new_seller_id, high.id);
        assert_eq!(outcome.reassigned[0].new_seller_stock, 9);

        // Verify persistence
        let stored = OrderItem::find_by_id(item.id).one(&db).await?.unwrap();
        assert_eq!(stored.seller_id, high.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_repair_tie_breaks_on_lower_seller_id() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "buyer@example.com", "Buyer").await?;
        let first = create_test_user(&db, "first@example.com", "First").await?;
        let second = create_test_user(&db, "second@example.com", "Second").await?;
        let product = create_test_product(&db, "Kettle", 2200).await?;
        set_stock(&db, second.id, product.id, 4).await?;
        set_stock(&db, first.id, product.id, 4).await?;

        let order = create_test_order(&db, buyer.id, "2024-05-01 00:00:00", 2200, true).await?;
        add_order_item(&db, order.id, product.id, buyer.id, 1, 2200).await?;

        let outcome = repair_self_dealing(&db, buyer.id).await?;
        assert_eq!(outcome.reassigned.len(), 1);
        assert!(first.id < second.id);
        assert_eq!(outcome.reassigned[0].new_seller_id, first.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_repair_skips_buyer_stock_and_empty_stock() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "buyer@example.com", "Buyer").await?;
        let empty = create_test_user(&db, "empty@example.com", "Empty").await?;
        let viable = create_test_user(&db, "viable@example.com", "Viable").await?;
        let product = create_test_product(&db, "Stove", 4000).await?;
        // The buyer's own deep stock must never win
        set_stock(&db, buyer.id, product.id, 100).await?;
        set_stock(&db, empty.id, product.id, 0).await?;
        set_stock(&db, viable.id, product.id, 2).await?;

        let order = create_test_order(&db, buyer.id, "2024-05-01 00:00:00", 4000, true).await?;
        add_order_item(&db, order.id, product.id, buyer.id, 1, 4000).await?;

        let outcome = repair_self_dealing(&db, buyer.id).await?;
        assert_eq!(outcome.reassigned.len(), 1);
        assert_eq!(outcome.reassigned[0].new_seller_id, viable.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_repair_reports_unresolvable_item_and_leaves_it() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "buyer@example.com", "Buyer").await?;
        let empty = create_test_user(&db, "empty@example.com", "Empty").await?;
        let product = create_test_product(&db, "Compass", 900).await?;
        set_stock(&db, buyer.id, product.id, 50).await?;
        set_stock(&db, empty.id, product.id, 0).await?;

        let order = create_test_order(&db, buyer.id, "2024-05-01 00:00:00", 900, true).await?;
        let item = add_order_item(&db, order.id, product.id, buyer.id, 1, 900).await?;

        let outcome = repair_self_dealing(&db, buyer.id).await?;
        assert!(outcome.reassigned.is_empty());
        assert_eq!(
            outcome.unresolved,
            vec![UnresolvedItem {
                order_item_id: item.id,
                product_id: product.id,
            }]
        );
        assert!(!outcome.is_clean());

        // The item stays attributed to the buyer
        let stored = OrderItem::find_by_id(item.id).one(&db).await?.unwrap();
        assert_eq!(stored.seller_id, buyer.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_repair_handles_mixed_resolvable_and_unresolvable() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "buyer@example.com", "Buyer").await?;
        let seller = create_test_user(&db, "seller@example.com", "Seller").await?;
        let stocked = create_test_product(&db, "Hatchet", 3000).await?;
        let orphaned = create_test_product(&db, "Ghost Item", 100).await?;
        set_stock(&db, seller.id, stocked.id, 3).await?;

        let order = create_test_order(&db, buyer.id, "2024-05-01 00:00:00", 3100, true).await?;
        let fixable = add_order_item(&db, order.id, stocked.id, buyer.id, 1, 3000).await?;
        let stuck = add_order_item(&db, order.id, orphaned.id, buyer.id, 1, 100).await?;

        let outcome = repair_self_dealing(&db, buyer.id).await?;
        assert_eq!(outcome.reassigned.len(), 1);
        assert_eq!(outcome.reassigned[0].order_item_id, fixable.id);
        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(outcome.unresolved[0].order_item_id, stuck.id);

        let stored = OrderItem::find_by_id(fixable.id).one(&db).await?.unwrap();
        assert_eq!(stored.seller_id, seller.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_repair_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "buyer@example.com", "Buyer").await?;
        let seller = create_test_user(&db, "seller@example.com", "Seller").await?;
        let product = create_test_product(&db, "Rope", 800).await?;
        set_stock(&db, seller.id, product.id, 10).await?;

        let order = create_test_order(&db, buyer.id, "2024-05-01 00:00:00", 800, true).await?;
        add_order_item(&db, order.id, product.id, buyer.id, 1, 800).await?;

        let first = repair_self_dealing(&db, buyer.id).await?;
        assert_eq!(first.reassigned.len(), 1);

        let second = repair_self_dealing(&db, buyer.id).await?;
        assert!(second.is_clean());

        Ok(())
    }

    #[tokio::test]
    async fn test_repair_leaves_inventory_and_prices_untouched() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "buyer@example.com", "Buyer").await?;
        let seller = create_test_user(&db, "seller@example.com", "Seller").await?;
        let product = create_test_product(&db, "Tarp", 1200).await?;
        set_stock(&db, seller.id, product.id, 7).await?;

        let order = create_test_order(&db, buyer.id, "2024-05-01 00:00:00", 2400, true).await?;
        let item = add_order_item(&db, order.id, product.id, buyer.id, 2, 1200).await?;

        repair_self_dealing(&db, buyer.id).await?;

        let stock = Inventory::find_by_id((seller.id, product.id))
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(stock.quantity, 7);

        let stored_item = OrderItem::find_by_id(item.id).one(&db).await?.unwrap();
        assert_eq!(stored_item.quantity, 2);
        assert_eq!(stored_item.unit_price_cents, 1200);

        let stored_order = Order::find_by_id(order.id).one(&db).await?.unwrap();
        assert_eq!(stored_order.total_cents, 2400);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_self_dealing_buyers() -> Result<()> {
        let db = setup_test_db().await?;
        let clean = create_test_user(&db, "clean@example.com", "Clean").await?;
        let dirty_a = create_test_user(&db, "a@example.com", "A").await?;
        let dirty_b = create_test_user(&db, "b@example.com", "B").await?;
        let seller = create_test_user(&db, "seller@example.com", "Seller").await?;
        let product = create_test_product(&db, "Mug", 600).await?;

        let ok_order = create_test_order(&db, clean.id, "2024-05-01 00:00:00", 600, true).await?;
        add_order_item(&db, ok_order.id, product.id, seller.id, 1, 600).await?;
        let bad_a = create_test_order(&db, dirty_a.id, "2024-05-02 00:00:00", 600, true).await?;
        add_order_item(&db, bad_a.id, product.id, dirty_a.id, 1, 600).await?;
        let bad_b = create_test_order(&db, dirty_b.id, "2024-05-03 00:00:00", 600, true).await?;
        add_order_item(&db, bad_b.id, product.id, dirty_b.id, 1, 600).await?;
        // A second offending item must not duplicate the buyer
        add_order_item(&db, bad_b.id, product.id, dirty_b.id, 1, 600).await?;

        let buyers = find_self_dealing_buyers(&db).await?;
        assert_eq!(buyers, vec![dirty_a.id, dirty_b.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_repair_unknown_buyer() -> Result<()> {
        let db = setup_test_db().await?;

        let result = repair_self_dealing(&db, 404).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound {
                entity: "user",
                id: 404
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_format_repair_summary() -> Result<()> {
        let outcome = RepairOutcome {
            buyer_id: 3,
            reassigned: vec![ReassignedItem {
                order_item_id: 10,
                product_id: 7,
                previous_seller_id: 3,
                new_seller_id: 5,
                new_seller_stock: 9,
            }],
            unresolved: vec![UnresolvedItem {
                order_item_id: 14,
                product_id: 9,
            }],
        };

        let summary = format_repair_summary(&outcome);
        assert!(summary.contains("buyer 3"));
        assert!(summary.contains("1 reassigned, 1 unresolved"));
        assert!(summary.contains("item 10 (product 7): seller 3 -> seller 5 (stock 9)"));
        assert!(summary.contains("item 14 (product 9): no eligible seller"));

        let clean = RepairOutcome {
            buyer_id: 8,
            reassigned: Vec::new(),
            unresolved: Vec::new(),
        };
        assert!(format_repair_summary(&clean).contains("nothing to repair"));

        Ok(())
    }
}
