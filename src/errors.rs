use thiserror::Error;

/// Errors surfaced by the marketplace data layer.
///
/// Validation failures get their own variants so callers can branch on them
/// without string matching; everything from the driver funnels through
/// [`Error::Database`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    #[error("no eligible seller for order item {order_item_id} (product {product_id})")]
    UnresolvableSeller { order_item_id: i64, product_id: i64 },

    #[error(
        "balance for user {user_id} diverged: stored {balance_cents} cents, ledger sums to {ledger_cents} cents"
    )]
    BalanceMismatch {
        user_id: i64,
        balance_cents: i64,
        ledger_cents: i64,
    },

    #[error(
        "total for order {order_id} diverged: stored {total_cents} cents, items sum to {items_cents} cents"
    )]
    OrderTotalMismatch {
        order_id: i64,
        total_cents: i64,
        items_cents: i64,
    },

    #[error("insufficient funds: balance is {balance_cents} cents, needed {required_cents} cents")]
    InsufficientFunds {
        balance_cents: i64,
        required_cents: i64,
    },

    #[error("rating {rating} is out of range (expected 1..=5)")]
    InvalidRating { rating: i16 },

    #[error("vote value {value} is invalid (expected -1 or +1)")]
    InvalidVote { value: i16 },

    #[error("user {user_id} cannot review themselves")]
    SelfReview { user_id: i64 },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("malformed row in {file} at line {line}: {message}")]
    MalformedRow {
        file: String,
        line: usize,
        message: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
