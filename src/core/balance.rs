//! Account balance operations over the ledger/projection pair.
//!
//! Every balance change appends a `balance_tx` ledger row and bumps the
//! `account_balance` projection in the same transaction. The ledger is the
//! source of truth; the projection exists so reads skip the sum. The pair
//! is re-verified inside each write and divergence rolls the write back.

use crate::{
    entities::{AccountBalance, BalanceTx, account_balance, balance_tx},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::debug;

/// Projected balance in cents, 0 when the user has no projection row yet.
pub async fn get_balance(db: &DatabaseConnection, user_id: i64) -> Result<i64> {
    super::ensure_user(db, user_id).await?;
    stored_balance(db, user_id).await
}

async fn stored_balance<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<i64> {
    Ok(AccountBalance::find_by_id(user_id)
        .one(db)
        .await?
        .map_or(0, |row| row.balance_cents))
}

/// Sum of the user's ledger rows in cents.
async fn ledger_total<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<i64> {
    let total: Option<Option<i64>> = BalanceTx::find()
        .filter(balance_tx::Column::UserId.eq(user_id))
        .select_only()
        .column_as(balance_tx::Column::AmountCents.sum(), "total")
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}

/// Applies a signed balance change and appends the matching ledger row.
///
/// Runs as one transaction: the projection update and the ledger append
/// land together or not at all. A change that would take the balance below
/// zero is rejected with [`Error::InsufficientFunds`]. Before committing,
/// the projection is compared against the ledger sum; on divergence
/// (including corruption that predates this call) the write rolls back
/// with [`Error::BalanceMismatch`] so the damage never compounds. A zero
/// delta returns the current balance without writing a ledger row.
pub async fn adjust_balance(
    db: &DatabaseConnection,
    user_id: i64,
    delta_cents: i64,
    note: &str,
) -> Result<i64> {
    super::ensure_user(db, user_id).await?;
    if delta_cents == 0 {
        return stored_balance(db, user_id).await;
    }

    let txn = db.begin().await?;

    if AccountBalance::find_by_id(user_id).one(&txn).await?.is_none() {
        account_balance::ActiveModel {
            user_id: Set(user_id),
            balance_cents: Set(0),
        }
        .insert(&txn)
        .await?;
    }

    let current = stored_balance(&txn, user_id).await?;
    if current + delta_cents < 0 {
        return Err(Error::InsufficientFunds {
            balance_cents: current,
            required_cents: -delta_cents,
        });
    }

    AccountBalance::update_many()
        .col_expr(
            account_balance::Column::BalanceCents,
            Expr::col(account_balance::Column::BalanceCents).add(delta_cents),
        )
        .filter(account_balance::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    balance_tx::ActiveModel {
        user_id: Set(user_id),
        amount_cents: Set(delta_cents),
        created_at: Set(Utc::now()),
        note: Set(note.to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let stored = stored_balance(&txn, user_id).await?;
    let ledger = ledger_total(&txn, user_id).await?;
    if stored != ledger {
        // Dropping the transaction rolls the write back
        return Err(Error::BalanceMismatch {
            user_id,
            balance_cents: stored,
            ledger_cents: ledger,
        });
    }

    txn.commit().await?;
    debug!(
        "Adjusted balance for user {} by {} cents to {}",
        user_id, delta_cents, stored
    );
    Ok(stored)
}

/// Checks the projection against the ledger sum, returning the balance
/// when they agree and [`Error::BalanceMismatch`] when they do not.
pub async fn verify_balance(db: &DatabaseConnection, user_id: i64) -> Result<i64> {
    super::ensure_user(db, user_id).await?;
    let stored = stored_balance(db, user_id).await?;
    let ledger = ledger_total(db, user_id).await?;
    if stored == ledger {
        Ok(stored)
    } else {
        Err(Error::BalanceMismatch {
            user_id,
            balance_cents: stored,
            ledger_cents: ledger,
        })
    }
}

/// Resets the projection to the ledger sum and returns it. This is the
/// repair path for a projection that [`verify_balance`] flagged.
pub async fn recompute_balance(db: &DatabaseConnection, user_id: i64) -> Result<i64> {
    super::ensure_user(db, user_id).await?;

    let txn = db.begin().await?;
    let ledger = ledger_total(&txn, user_id).await?;
    match AccountBalance::find_by_id(user_id).one(&txn).await? {
        Some(row) => {
            let mut active: account_balance::ActiveModel = row.into();
            active.balance_cents = Set(ledger);
            active.update(&txn).await?;
        }
        None => {
            account_balance::ActiveModel {
                user_id: Set(user_id),
                balance_cents: Set(ledger),
            }
            .insert(&txn)
            .await?;
        }
    }
    txn.commit().await?;
    Ok(ledger)
}

/// One user whose projection and ledger disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMismatchRow {
    pub user_id: i64,
    /// What the projection says
    pub balance_cents: i64,
    /// What the ledger says
    pub ledger_cents: i64,
}

/// Scans every account for projection/ledger divergence, ascending by user
/// id. Users with ledger rows but no projection row count as projecting 0.
pub async fn find_balance_mismatches(db: &DatabaseConnection) -> Result<Vec<BalanceMismatchRow>> {
    let sums: Vec<(i64, Option<i64>)> = BalanceTx::find()
        .select_only()
        .column(balance_tx::Column::UserId)
        .column_as(balance_tx::Column::AmountCents.sum(), "total")
        .group_by(balance_tx::Column::UserId)
        .into_tuple()
        .all(db)
        .await?;
    let mut ledger: std::collections::HashMap<i64, i64> = sums
        .into_iter()
        .map(|(user_id, total)| (user_id, total.unwrap_or(0)))
        .collect();

    let mut mismatches = Vec::new();
    let projections = AccountBalance::find()
        .order_by_asc(account_balance::Column::UserId)
        .all(db)
        .await?;
    for projection in projections {
        let expected = ledger.remove(&projection.user_id).unwrap_or(0);
        if projection.balance_cents != expected {
            mismatches.push(BalanceMismatchRow {
                user_id: projection.user_id,
                balance_cents: projection.balance_cents,
                ledger_cents: expected,
            });
        }
    }
    // Ledger rows with no projection row at all
    for (user_id, expected) in ledger {
        if expected != 0 {
            mismatches.push(BalanceMismatchRow {
                user_id,
                balance_cents: 0,
                ledger_cents: expected,
            });
        }
    }
    mismatches.sort_by_key(|row| row.user_id);
    Ok(mismatches)
}

/// The user's ledger entries, newest first.
pub async fn get_balance_history(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<balance_tx::Model>> {
    super::ensure_user(db, user_id).await?;
    BalanceTx::find()
        .filter(balance_tx::Column::UserId.eq(user_id))
        .order_by_desc(balance_tx::Column::CreatedAt)
        .order_by_desc(balance_tx::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
