//! Record parsers for the seed CSV exports.
//!
//! Each parser turns one headerless CSV record into an `ActiveModel` with
//! its explicit id, or a field-level error message the loader wraps with
//! file and line context. Column orders follow the original seed exports.

use crate::entities::{
    account_balance, balance_tx, inventory, order, order_item, product, product_review, purchase,
    review_vote, seller_review, user, wish,
};
use csv::StringRecord;
use sea_orm::Set;
use sea_orm::prelude::*;

/// Timestamp layout used throughout the seed exports.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type RowResult<T> = std::result::Result<T, String>;

fn field<'r>(record: &'r StringRecord, index: usize, name: &str) -> RowResult<&'r str> {
    record
        .get(index)
        .ok_or_else(|| format!("missing column {index} ({name})"))
}

fn parse_i64(record: &StringRecord, index: usize, name: &str) -> RowResult<i64> {
    let value = field(record, index, name)?;
    value
        .parse()
        .map_err(|_| format!("column {index} ({name}): {value:?} is not an integer"))
}

fn parse_i32(record: &StringRecord, index: usize, name: &str) -> RowResult<i32> {
    let value = field(record, index, name)?;
    value
        .parse()
        .map_err(|_| format!("column {index} ({name}): {value:?} is not an integer"))
}

fn parse_i16(record: &StringRecord, index: usize, name: &str) -> RowResult<i16> {
    let value = field(record, index, name)?;
    value
        .parse()
        .map_err(|_| format!("column {index} ({name}): {value:?} is not an integer"))
}

fn parse_bool(record: &StringRecord, index: usize, name: &str) -> RowResult<bool> {
    let value = field(record, index, name)?;
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!(
            "column {index} ({name}): {value:?} is not \"true\" or \"false\""
        )),
    }
}

fn parse_datetime(record: &StringRecord, index: usize, name: &str) -> RowResult<DateTimeUtc> {
    let value = field(record, index, name)?;
    chrono::NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|_| format!("column {index} ({name}): {value:?} is not a timestamp"))
}

fn parse_opt_datetime(
    record: &StringRecord,
    index: usize,
    name: &str,
) -> RowResult<Option<DateTimeUtc>> {
    if field(record, index, name)?.is_empty() {
        Ok(None)
    } else {
        parse_datetime(record, index, name).map(Some)
    }
}

/// Converts a decimal-dollar string like `"123.45"` to integer cents using
/// string arithmetic. Floats would round some prices off by a cent.
fn dollars_to_cents(value: &str) -> RowResult<i64> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let (whole, frac) = match digits.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (digits, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(format!("{value:?} is not a decimal price"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("{value:?} is not a decimal price"));
    }
    if frac.len() > 2 {
        return Err(format!("{value:?} has more than two decimal places"));
    }

    let whole_cents: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| format!("{value:?} is out of range"))?
    };
    let frac_cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().unwrap_or(0) * 10,
        _ => frac.parse::<i64>().unwrap_or(0),
    };
    let cents = whole_cents
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac_cents))
        .ok_or_else(|| format!("{value:?} is out of range"))?;

    Ok(if negative { -cents } else { cents })
}

/// `Users.csv`: id, email, full_name, address, password_hash, created_at.
/// Trailing legacy columns are ignored.
pub fn user_from_record(record: &StringRecord) -> RowResult<user::ActiveModel> {
    Ok(user::ActiveModel {
        id: Set(parse_i64(record, 0, "id")?),
        email: Set(field(record, 1, "email")?.to_string()),
        full_name: Set(field(record, 2, "full_name")?.to_string()),
        address: Set(field(record, 3, "address")?.to_string()),
        password_hash: Set(field(record, 4, "password_hash")?.to_string()),
        created_at: Set(parse_datetime(record, 5, "created_at")?),
    })
}

/// `Products.csv`: id, name, price (decimal dollars), available.
pub fn product_from_record(record: &StringRecord) -> RowResult<product::ActiveModel> {
    Ok(product::ActiveModel {
        id: Set(parse_i64(record, 0, "id")?),
        name: Set(field(record, 1, "name")?.to_string()),
        price_cents: Set(dollars_to_cents(field(record, 2, "price")?)?),
        available: Set(parse_bool(record, 3, "available")?),
        description: Set(None),
    })
}

/// `AccountBalance.csv`: user_id, balance_cents.
pub fn account_balance_from_record(
    record: &StringRecord,
) -> RowResult<account_balance::ActiveModel> {
    Ok(account_balance::ActiveModel {
        user_id: Set(parse_i64(record, 0, "user_id")?),
        balance_cents: Set(parse_i64(record, 1, "balance_cents")?),
    })
}

/// `BalanceTx.csv`: id, user_id, amount_cents, created_at, note.
pub fn balance_tx_from_record(record: &StringRecord) -> RowResult<balance_tx::ActiveModel> {
    Ok(balance_tx::ActiveModel {
        id: Set(parse_i64(record, 0, "id")?),
        user_id: Set(parse_i64(record, 1, "user_id")?),
        amount_cents: Set(parse_i64(record, 2, "amount_cents")?),
        created_at: Set(parse_datetime(record, 3, "created_at")?),
        note: Set(field(record, 4, "note")?.to_string()),
    })
}

/// `Orders.csv`: id, buyer_id, created_at, total_cents, fulfilled.
pub fn order_from_record(record: &StringRecord) -> RowResult<order::ActiveModel> {
    Ok(order::ActiveModel {
        id: Set(parse_i64(record, 0, "id")?),
        buyer_id: Set(parse_i64(record, 1, "buyer_id")?),
        created_at: Set(parse_datetime(record, 2, "created_at")?),
        total_cents: Set(parse_i64(record, 3, "total_cents")?),
        fulfilled: Set(parse_bool(record, 4, "fulfilled")?),
    })
}

/// `OrderItems.csv`: id, order_id, product_id, seller_id, quantity,
/// unit_price_cents, fulfilled_at (empty = null).
pub fn order_item_from_record(record: &StringRecord) -> RowResult<order_item::ActiveModel> {
    Ok(order_item::ActiveModel {
        id: Set(parse_i64(record, 0, "id")?),
        order_id: Set(parse_i64(record, 1, "order_id")?),
        product_id: Set(parse_i64(record, 2, "product_id")?),
        seller_id: Set(parse_i64(record, 3, "seller_id")?),
        quantity: Set(parse_i32(record, 4, "quantity")?),
        unit_price_cents: Set(parse_i64(record, 5, "unit_price_cents")?),
        fulfilled_at: Set(parse_opt_datetime(record, 6, "fulfilled_at")?),
    })
}

/// `Purchases.csv`: id, user_id, product_id, time_purchased.
pub fn purchase_from_record(record: &StringRecord) -> RowResult<purchase::ActiveModel> {
    Ok(purchase::ActiveModel {
        id: Set(parse_i64(record, 0, "id")?),
        user_id: Set(parse_i64(record, 1, "user_id")?),
        product_id: Set(parse_i64(record, 2, "product_id")?),
        time_purchased: Set(parse_datetime(record, 3, "time_purchased")?),
    })
}

/// `Wishes.csv`: id, user_id, product_id, time_added.
pub fn wish_from_record(record: &StringRecord) -> RowResult<wish::ActiveModel> {
    Ok(wish::ActiveModel {
        id: Set(parse_i64(record, 0, "id")?),
        user_id: Set(parse_i64(record, 1, "user_id")?),
        product_id: Set(parse_i64(record, 2, "product_id")?),
        time_added: Set(parse_datetime(record, 3, "time_added")?),
    })
}

/// `Inventory.csv`: seller_id, product_id, quantity.
pub fn inventory_from_record(record: &StringRecord) -> RowResult<inventory::ActiveModel> {
    Ok(inventory::ActiveModel {
        seller_id: Set(parse_i64(record, 0, "seller_id")?),
        product_id: Set(parse_i64(record, 1, "product_id")?),
        quantity: Set(parse_i32(record, 2, "quantity")?),
    })
}

/// `ProductReviews.csv`: id, user_id, product_id, rating, body, created_at,
/// updated_at.
pub fn product_review_from_record(
    record: &StringRecord,
) -> RowResult<product_review::ActiveModel> {
    Ok(product_review::ActiveModel {
        id: Set(parse_i64(record, 0, "id")?),
        user_id: Set(parse_i64(record, 1, "user_id")?),
        product_id: Set(parse_i64(record, 2, "product_id")?),
        rating: Set(parse_i16(record, 3, "rating")?),
        body: Set(field(record, 4, "body")?.to_string()),
        created_at: Set(parse_datetime(record, 5, "created_at")?),
        updated_at: Set(parse_datetime(record, 6, "updated_at")?),
    })
}

/// `SellerReviews.csv`: id, user_id, seller_id, rating, body, created_at,
/// updated_at.
pub fn seller_review_from_record(record: &StringRecord) -> RowResult<seller_review::ActiveModel> {
    Ok(seller_review::ActiveModel {
        id: Set(parse_i64(record, 0, "id")?),
        user_id: Set(parse_i64(record, 1, "user_id")?),
        seller_id: Set(parse_i64(record, 2, "seller_id")?),
        rating: Set(parse_i16(record, 3, "rating")?),
        body: Set(field(record, 4, "body")?.to_string()),
        created_at: Set(parse_datetime(record, 5, "created_at")?),
        updated_at: Set(parse_datetime(record, 6, "updated_at")?),
    })
}

/// `ReviewVotes.csv`: voter_id, review_id, value.
pub fn review_vote_from_record(record: &StringRecord) -> RowResult<review_vote::ActiveModel> {
    Ok(review_vote::ActiveModel {
        voter_id: Set(parse_i64(record, 0, "voter_id")?),
        review_id: Set(parse_i64(record, 1, "review_id")?),
        value: Set(parse_i16(record, 2, "value")?),
    })
}
