//! Purchase history business logic - the read side of the order schema.
//!
//! Reconstructs buyer-facing views (history pages, order detail, recent
//! line items, lifetime summary) from the normalized orders/order_items
//! tables. History pagination is cursor-keyed on `(created_at, id)` rather
//! than offset-based, so a page walk never re-shows or skips rows when new
//! orders land between fetches. Also carries the verify/recompute pair for
//! the denormalized order total, which is a projection of the line items
//! and must never be trusted blindly.

use crate::{
    entities::{Order, OrderItem, Product, User, order, order_item, product, user},
    errors::{Error, Result},
};
use sea_orm::sea_query::{Expr, Func, Query, SelectStatement};
use sea_orm::{
    Condition, JoinType, PaginatorTrait, QueryOrder, QuerySelect, RelationTrait, Select, Set,
    TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Default page size for purchase history.
pub const DEFAULT_HISTORY_PAGE_SIZE: u64 = 20;
/// Largest page size purchase history will serve.
pub const MAX_HISTORY_PAGE_SIZE: u64 = 50;
/// Default row count for the recent line item feed.
pub const DEFAULT_RECENT_ITEMS: u64 = 20;
/// Largest row count the recent line item feed will serve.
pub const MAX_RECENT_ITEMS: u64 = 100;

/// Item names spelled out in an order snippet before eliding the rest.
const SNIPPET_ITEM_NAMES: usize = 3;

/// Optional filters for a purchase history query. All present fields must
/// hold at once.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Only orders placed at or after this instant
    pub from: Option<DateTimeUtc>,
    /// Only orders placed strictly before this instant
    pub until: Option<DateTimeUtc>,
    /// Only orders in this fulfillment state
    pub fulfilled: Option<bool>,
    /// Only orders containing a product whose name holds this
    /// case-insensitive substring
    pub item_name: Option<String>,
}

impl HistoryFilter {
    fn validate(&self) -> Result<()> {
        if let (Some(from), Some(until)) = (self.from, self.until) {
            if until < from {
                return Err(Error::InvalidFilter {
                    message: format!("date range ends before it starts ({until} < {from})"),
                });
            }
        }
        if let Some(name) = &self.item_name {
            if name.trim().is_empty() {
                return Err(Error::InvalidFilter {
                    message: "item name filter is empty".to_string(),
                });
            }
        }
        Ok(())
    }

    fn normalized_item_name(&self) -> Option<String> {
        self.item_name
            .as_deref()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
    }
}

/// Resume point for paging through purchase history.
///
/// Carries the sort key of the last row the previous page showed; the next
/// page starts strictly after it in `(created_at DESC, id DESC)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    /// `created_at` of the last order on the previous page
    pub created_at: DateTimeUtc,
    /// Id of the last order on the previous page; breaks timestamp ties
    pub order_id: i64,
}

/// Page size and resume point for a purchase history query.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest {
    /// Rows per page, clamped to 1..=[`MAX_HISTORY_PAGE_SIZE`];
    /// [`DEFAULT_HISTORY_PAGE_SIZE`] when unset
    pub limit: Option<u64>,
    /// Cursor from the previous page's `next` field, None for the first page
    pub cursor: Option<PageCursor>,
}

/// One order row in a purchase history page.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub order_id: i64,
    pub created_at: DateTimeUtc,
    pub total_cents: i64,
    pub fulfilled: bool,
    /// Number of line items on the order
    pub item_count: usize,
    /// Leading item names, e.g. `"Anvil, Rope (+2 more)"`
    pub item_snippet: String,
}

/// One page of purchase history.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    /// Orders on this page, newest first
    pub orders: Vec<OrderSummary>,
    /// Orders matching the filter across all pages
    pub total_matching: u64,
    /// Cursor for the following page, None on the last page
    pub next: Option<PageCursor>,
}

/// Pages through a buyer's order history, newest first.
///
/// Rejects malformed filters before touching the database. The page is
/// keyed on the cursor rather than an offset, so walking pages while new
/// orders arrive neither duplicates nor drops rows that existed when the
/// walk began.
pub async fn get_purchases_for_user(
    db: &DatabaseConnection,
    user_id: i64,
    filter: &HistoryFilter,
    page: &PageRequest,
) -> Result<HistoryPage> {
    filter.validate()?;
    super::ensure_user(db, user_id).await?;

    let query = history_query(user_id, filter);
    let total_matching = query.clone().count(db).await?;

    let limit = page
        .limit
        .unwrap_or(DEFAULT_HISTORY_PAGE_SIZE)
        .clamp(1, MAX_HISTORY_PAGE_SIZE);

    let mut query = query;
    if let Some(cursor) = &page.cursor {
        query = query.filter(
            Condition::any()
                .add(order::Column::CreatedAt.lt(cursor.created_at))
                .add(
                    Condition::all()
                        .add(order::Column::CreatedAt.eq(cursor.created_at))
                        .add(order::Column::Id.lt(cursor.order_id)),
                ),
        );
    }

    // One extra row tells us whether another page exists
    let mut rows = query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .limit(limit + 1)
        .all(db)
        .await?;

    let next = if rows.len() as u64 > limit {
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        rows.last().map(|last| PageCursor {
            created_at: last.created_at,
            order_id: last.id,
        })
    } else {
        None
    };

    let orders = summarize_orders(db, rows).await?;

    Ok(HistoryPage {
        orders,
        total_matching,
        next,
    })
}

/// Builds the filtered (unordered, unpaged) history query for a buyer.
fn history_query(user_id: i64, filter: &HistoryFilter) -> Select<order::Entity> {
    let mut query = Order::find().filter(order::Column::BuyerId.eq(user_id));

    if let Some(from) = filter.from {
        query = query.filter(order::Column::CreatedAt.gte(from));
    }
    if let Some(until) = filter.until {
        query = query.filter(order::Column::CreatedAt.lt(until));
    }
    if let Some(fulfilled) = filter.fulfilled {
        query = query.filter(order::Column::Fulfilled.eq(fulfilled));
    }
    if let Some(needle) = filter.normalized_item_name() {
        query = query.filter(order::Column::Id.in_subquery(orders_containing_item(&needle)));
    }

    query
}

/// Subquery for ids of orders containing a product whose lowercased name
/// holds `needle` (already lowercased) as a substring.
fn orders_containing_item(needle: &str) -> SelectStatement {
    let pattern = format!("%{needle}%");
    Query::select()
        .column((OrderItem, order_item::Column::OrderId))
        .from(OrderItem)
        .inner_join(
            Product,
            Expr::col((Product, product::Column::Id))
                .equals((OrderItem, order_item::Column::ProductId)),
        )
        .and_where(
            Expr::expr(Func::lower(Expr::col((Product, product::Column::Name)))).like(pattern),
        )
        .to_owned()
}

/// Attaches item counts and name snippets to a page of orders.
async fn summarize_orders(
    db: &DatabaseConnection,
    rows: Vec<order::Model>,
) -> Result<Vec<OrderSummary>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i64> = rows.iter().map(|o| o.id).collect();
    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;

    let product_names = product_names_for(db, items.iter().map(|i| i.product_id)).await?;

    let mut by_order: HashMap<i64, Vec<order_item::Model>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    Ok(rows
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderSummary {
                order_id: order.id,
                created_at: order.created_at,
                total_cents: order.total_cents,
                fulfilled: order.fulfilled,
                item_count: items.len(),
                item_snippet: item_snippet(&items, &product_names),
            }
        })
        .collect())
}

/// Renders the leading item names of an order, e.g. `"Anvil, Rope (+2 more)"`.
fn item_snippet(items: &[order_item::Model], product_names: &HashMap<i64, String>) -> String {
    let names: Vec<&str> = items
        .iter()
        .take(SNIPPET_ITEM_NAMES)
        .map(|item| {
            product_names
                .get(&item.product_id)
                .map_or("(unknown product)", String::as_str)
        })
        .collect();

    let mut snippet = names.join(", ");
    if items.len() > SNIPPET_ITEM_NAMES {
        use std::fmt::Write;
        // write! is infallible when writing to String, so unwrap is safe
        write!(snippet, " (+{} more)", items.len() - SNIPPET_ITEM_NAMES).unwrap();
    }
    snippet
}

/// Batch-fetches product names keyed by id.
async fn product_names_for<I>(db: &DatabaseConnection, ids: I) -> Result<HashMap<i64, String>>
where
    I: IntoIterator<Item = i64>,
{
    let unique: HashSet<i64> = ids.into_iter().collect();
    if unique.is_empty() {
        return Ok(HashMap::new());
    }
    let products = Product::find()
        .filter(product::Column::Id.is_in(unique))
        .all(db)
        .await?;
    Ok(products.into_iter().map(|p| (p.id, p.name)).collect())
}

/// One line of an order, joined with display fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemDetail {
    pub order_item_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub seller_id: i64,
    /// Seller display name, None if the account no longer exists
    pub seller_name: Option<String>,
    pub quantity: i32,
    pub unit_price_cents: i64,
    /// `quantity * unit_price_cents`
    pub line_total_cents: i64,
    pub fulfilled_at: Option<DateTimeUtc>,
}

/// Full detail view of one order: the header row plus every line item.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: order::Model,
    /// Line items in insertion order
    pub items: Vec<LineItemDetail>,
}

/// Fetches one order with its line items joined against product and seller
/// names. Whether the caller may see this order is the caller's check.
pub async fn get_order_detail(db: &DatabaseConnection, order_id: i64) -> Result<OrderDetail> {
    let order = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "order",
            id: order_id,
        })?;

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;

    let product_names = product_names_for(db, items.iter().map(|i| i.product_id)).await?;

    let seller_ids: HashSet<i64> = items.iter().map(|i| i.seller_id).collect();
    let seller_names: HashMap<i64, String> = if seller_ids.is_empty() {
        HashMap::new()
    } else {
        User::find()
            .filter(user::Column::Id.is_in(seller_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.full_name))
            .collect()
    };

    let items = items
        .into_iter()
        .map(|item| LineItemDetail {
            order_item_id: item.id,
            product_id: item.product_id,
            product_name: product_names
                .get(&item.product_id)
                .cloned()
                .unwrap_or_default(),
            seller_id: item.seller_id,
            seller_name: seller_names.get(&item.seller_id).cloned(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            line_total_cents: i64::from(item.quantity) * item.unit_price_cents,
            fulfilled_at: item.fulfilled_at,
        })
        .collect();

    Ok(OrderDetail { order, items })
}

/// One row of the recent purchases feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentLineItem {
    pub order_item_id: i64,
    pub order_id: i64,
    /// When the containing order was placed
    pub ordered_at: DateTimeUtc,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub fulfilled_at: Option<DateTimeUtc>,
}

/// Most recent line items across a user's orders, newest order first, then
/// newest item within the order. Point-in-time snapshot, no cursor.
pub async fn get_recent_line_items_for_user(
    db: &DatabaseConnection,
    user_id: i64,
    limit: Option<u64>,
) -> Result<Vec<RecentLineItem>> {
    super::ensure_user(db, user_id).await?;

    let limit = limit
        .unwrap_or(DEFAULT_RECENT_ITEMS)
        .clamp(1, MAX_RECENT_ITEMS);

    let rows = OrderItem::find()
        .find_also_related(Order)
        .filter(order::Column::BuyerId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .order_by_desc(order_item::Column::Id)
        .limit(limit)
        .all(db)
        .await?;

    let product_names = product_names_for(db, rows.iter().map(|(item, _)| item.product_id)).await?;

    Ok(rows
        .into_iter()
        .filter_map(|(item, order)| order.map(|order| (item, order)))
        .map(|(item, order)| RecentLineItem {
            order_item_id: item.id,
            order_id: item.order_id,
            ordered_at: order.created_at,
            product_id: item.product_id,
            product_name: product_names
                .get(&item.product_id)
                .cloned()
                .unwrap_or_default(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            fulfilled_at: item.fulfilled_at,
        })
        .collect())
}

/// Lifetime purchase statistics for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseSummary {
    pub order_count: i64,
    /// Sum of order totals in cents
    pub total_spent_cents: i64,
    /// Distinct products across all the user's line items
    pub distinct_products: i64,
    pub last_order_at: Option<DateTimeUtc>,
}

/// Aggregates a user's purchase statistics straight from the order rows.
pub async fn get_purchase_summary(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<PurchaseSummary> {
    super::ensure_user(db, user_id).await?;

    let totals: Option<(i64, Option<i64>, Option<DateTimeUtc>)> = Order::find()
        .filter(order::Column::BuyerId.eq(user_id))
        .select_only()
        .column_as(order::Column::Id.count(), "order_count")
        .column_as(order::Column::TotalCents.sum(), "total_spent_cents")
        .column_as(order::Column::CreatedAt.max(), "last_order_at")
        .into_tuple()
        .one(db)
        .await?;
    let (order_count, total_spent_cents, last_order_at) = totals.unwrap_or((0, None, None));

    let distinct_products: Option<i64> = OrderItem::find()
        .join(JoinType::InnerJoin, order_item::Relation::Order.def())
        .filter(order::Column::BuyerId.eq(user_id))
        .select_only()
        .column_as(
            Expr::expr(Func::count_distinct(Expr::col((
                OrderItem,
                order_item::Column::ProductId,
            )))),
            "distinct_products",
        )
        .into_tuple()
        .one(db)
        .await?;

    Ok(PurchaseSummary {
        order_count,
        total_spent_cents: total_spent_cents.unwrap_or(0),
        distinct_products: distinct_products.unwrap_or(0),
        last_order_at,
    })
}

/// Sum of an order's line item subtotals in cents.
async fn items_total<C: ConnectionTrait>(db: &C, order_id: i64) -> Result<i64> {
    let total: Option<Option<i64>> = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .select_only()
        .column_as(
            Expr::expr(Func::sum(
                Expr::col(order_item::Column::Quantity)
                    .mul(Expr::col(order_item::Column::UnitPriceCents)),
            )),
            "total",
        )
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}

/// Checks the denormalized order total against the sum of its line items,
/// returning the total when they agree and [`Error::OrderTotalMismatch`]
/// when they do not.
pub async fn verify_order_total(db: &DatabaseConnection, order_id: i64) -> Result<i64> {
    let order = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "order",
            id: order_id,
        })?;
    let items = items_total(db, order_id).await?;
    if order.total_cents == items {
        Ok(items)
    } else {
        Err(Error::OrderTotalMismatch {
            order_id,
            total_cents: order.total_cents,
            items_cents: items,
        })
    }
}

/// Resets the denormalized total to the line item sum and returns it. This
/// is the repair path for a total that [`verify_order_total`] flagged.
pub async fn recompute_order_total(db: &DatabaseConnection, order_id: i64) -> Result<i64> {
    let txn = db.begin().await?;
    let order = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "order",
            id: order_id,
        })?;
    let items = items_total(&txn, order_id).await?;
    let mut active: order::ActiveModel = order.into();
    active.total_cents = Set(items);
    active.update(&txn).await?;
    txn.commit().await?;
    Ok(items)
}
