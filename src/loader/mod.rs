//! Bulk import of the seed CSV exports.
//!
//! Loads a directory of headerless CSV files into the marketplace schema
//! in foreign-key order, one transaction per file. Files absent from the
//! directory are skipped; partial exports are normal. After the load,
//! [`post_load_check`] repairs known self-dealing buyers and verifies the
//! balance invariant before the database is handed to the application.

mod rows;

use crate::{
    config::seed::SeedConfig,
    core::{balance, balance::BalanceMismatchRow, repair, repair::RepairOutcome},
    errors::{Error, Result},
};
use csv::StringRecord;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, TransactionTrait,
};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Rows per `insert_many` batch, sized to stay under `SQLite`'s bind
/// parameter limit for the widest table.
const INSERT_BATCH_SIZE: usize = 100;

/// Row counts per table for one load run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub users: u64,
    pub products: u64,
    pub account_balances: u64,
    pub balance_txs: u64,
    pub orders: u64,
    pub order_items: u64,
    pub inventory: u64,
    pub product_reviews: u64,
    pub seller_reviews: u64,
    pub review_votes: u64,
    pub purchases: u64,
    pub wishes: u64,
    /// Seed files absent from the data directory
    pub skipped_files: Vec<String>,
}

impl LoadReport {
    /// Total rows inserted across all tables.
    #[must_use]
    pub fn total_rows(&self) -> u64 {
        self.users
            + self.products
            + self.account_balances
            + self.balance_txs
            + self.orders
            + self.order_items
            + self.inventory
            + self.product_reviews
            + self.seller_reviews
            + self.review_votes
            + self.purchases
            + self.wishes
    }
}

/// Loads every seed file present in `config.data_dir`, in foreign-key
/// order so references always land after their targets.
#[instrument(skip(db, config))]
pub async fn load_dir(db: &DatabaseConnection, config: &SeedConfig) -> Result<LoadReport> {
    let dir = config.data_dir.as_path();
    let mut report = LoadReport::default();

    report.users =
        load_file(db, dir, "Users.csv", rows::user_from_record, &mut report).await?;
    report.products =
        load_file(db, dir, "Products.csv", rows::product_from_record, &mut report).await?;
    report.account_balances = load_file(
        db,
        dir,
        "AccountBalance.csv",
        rows::account_balance_from_record,
        &mut report,
    )
    .await?;
    report.balance_txs = load_file(
        db,
        dir,
        "BalanceTx.csv",
        rows::balance_tx_from_record,
        &mut report,
    )
    .await?;
    report.orders =
        load_file(db, dir, "Orders.csv", rows::order_from_record, &mut report).await?;
    report.order_items = load_file(
        db,
        dir,
        "OrderItems.csv",
        rows::order_item_from_record,
        &mut report,
    )
    .await?;
    report.inventory = load_file(
        db,
        dir,
        "Inventory.csv",
        rows::inventory_from_record,
        &mut report,
    )
    .await?;
    report.product_reviews = load_file(
        db,
        dir,
        "ProductReviews.csv",
        rows::product_review_from_record,
        &mut report,
    )
    .await?;
    report.seller_reviews = load_file(
        db,
        dir,
        "SellerReviews.csv",
        rows::seller_review_from_record,
        &mut report,
    )
    .await?;
    report.review_votes = load_file(
        db,
        dir,
        "ReviewVotes.csv",
        rows::review_vote_from_record,
        &mut report,
    )
    .await?;
    report.purchases = load_file(
        db,
        dir,
        "Purchases.csv",
        rows::purchase_from_record,
        &mut report,
    )
    .await?;
    report.wishes =
        load_file(db, dir, "Wishes.csv", rows::wish_from_record, &mut report).await?;

    info!(
        "Loaded {} rows across {} tables ({} files skipped)",
        report.total_rows(),
        12 - report.skipped_files.len(),
        report.skipped_files.len()
    );
    Ok(report)
}

/// Parses one seed file and inserts its rows in batches inside one
/// transaction. Returns the row count, or 0 after recording a skip when
/// the file does not exist.
async fn load_file<A, F>(
    db: &DatabaseConnection,
    dir: &Path,
    file_name: &str,
    parse: F,
    report: &mut LoadReport,
) -> Result<u64>
where
    A: ActiveModelTrait,
    F: Fn(&StringRecord) -> std::result::Result<A, String>,
{
    let path = dir.join(file_name);
    if !path.exists() {
        debug!("Seed file {} not present, skipping", file_name);
        report.skipped_files.push(file_name.to_string());
        return Ok(0);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(&path)?;

    let mut models = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let model = parse(&record).map_err(|message| Error::MalformedRow {
            file: file_name.to_string(),
            line: index + 1,
            message,
        })?;
        models.push(model);
    }

    let count = models.len() as u64;
    let txn = db.begin().await?;
    let mut pending = models.into_iter().peekable();
    while pending.peek().is_some() {
        let chunk: Vec<A> = pending.by_ref().take(INSERT_BATCH_SIZE).collect();
        <A::Entity as EntityTrait>::insert_many(chunk).exec(&txn).await?;
    }
    txn.commit().await?;

    info!("Loaded {} rows from {}", count, file_name);
    Ok(count)
}

/// Tables whose id column is an auto-increment identity.
const IDENTITY_TABLES: [&str; 9] = [
    "users",
    "products",
    "orders",
    "order_items",
    "balance_tx",
    "product_reviews",
    "seller_reviews",
    "purchases",
    "wishes",
];

/// Advances every identity sequence past the explicitly loaded ids so the
/// next insert does not collide. `SQLite` allocates from `max(rowid) + 1`
/// natively, so only Postgres needs statements.
pub async fn advance_id_sequences(db: &DatabaseConnection) -> Result<()> {
    if db.get_database_backend() == DbBackend::Postgres {
        for table in IDENTITY_TABLES {
            let sql = format!(
                "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
                 COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
            );
            db.execute_unprepared(&sql).await?;
        }
    }
    Ok(())
}

/// Findings of the post-load verification pass.
#[derive(Debug, Clone)]
pub struct LoadCheck {
    /// One outcome per configured repair buyer
    pub repairs: Vec<RepairOutcome>,
    /// Buyers still self-dealing after the configured repairs ran
    pub residual_self_dealing_buyers: Vec<i64>,
    /// Projection/ledger divergence remaining after reconciliation
    pub balance_mismatches: Vec<BalanceMismatchRow>,
    /// Users whose projection was recomputed from the ledger
    pub reconciled_users: Vec<i64>,
}

impl LoadCheck {
    /// True when the loaded data satisfies both storage invariants.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.residual_self_dealing_buyers.is_empty() && self.balance_mismatches.is_empty()
    }
}

/// Verifies and repairs the loaded data.
///
/// Runs the self-dealing repair for each buyer named in the config, then
/// scans for any buyer still self-dealing (including ones the repair could
/// not resolve). Balance projections are checked against their ledgers;
/// with `reconcile_balances` set, divergent projections are recomputed and
/// the scan repeated so the report reflects the final state.
#[instrument(skip(db, config))]
pub async fn post_load_check(
    db: &DatabaseConnection,
    config: &SeedConfig,
) -> Result<LoadCheck> {
    let mut repairs = Vec::new();
    for &buyer_id in &config.repair_buyer_ids {
        repairs.push(repair::repair_self_dealing(db, buyer_id).await?);
    }
    let residual_self_dealing_buyers = repair::find_self_dealing_buyers(db).await?;

    let mut balance_mismatches = balance::find_balance_mismatches(db).await?;
    let mut reconciled_users = Vec::new();
    if config.reconcile_balances && !balance_mismatches.is_empty() {
        for row in &balance_mismatches {
            balance::recompute_balance(db, row.user_id).await?;
            reconciled_users.push(row.user_id);
        }
        balance_mismatches = balance::find_balance_mismatches(db).await?;
    }

    Ok(LoadCheck {
        repairs,
        residual_self_dealing_buyers,
        balance_mismatches,
        reconciled_users,
    })
}

/// Formats a load report as a human-readable block.
#[must_use]
pub fn format_load_summary(report: &LoadReport) -> String {
    use std::fmt::Write;

    let mut summary = String::new();
    // write! is infallible when writing to String, so unwrap is safe
    writeln!(summary, "Seed load: {} rows", report.total_rows()).unwrap();
    let counts = [
        ("users", report.users),
        ("products", report.products),
        ("account_balance", report.account_balances),
        ("balance_tx", report.balance_txs),
        ("orders", report.orders),
        ("order_items", report.order_items),
        ("inventory", report.inventory),
        ("product_reviews", report.product_reviews),
        ("seller_reviews", report.seller_reviews),
        ("review_votes", report.review_votes),
        ("purchases", report.purchases),
        ("wishes", report.wishes),
    ];
    for (table, count) in counts {
        writeln!(summary, "  {table}: {count}").unwrap();
    }
    if !report.skipped_files.is_empty() {
        writeln!(summary, "  skipped: {}", report.skipped_files.join(", ")).unwrap();
    }
    summary
}

/// Formats the post-load findings as a human-readable block.
#[must_use]
pub fn format_check_summary(check: &LoadCheck) -> String {
    use std::fmt::Write;

    let mut summary = String::new();
    // write! is infallible when writing to String, so unwrap is safe
    if check.is_consistent() {
        writeln!(summary, "Post-load check: consistent").unwrap();
    } else {
        writeln!(summary, "Post-load check: INCONSISTENT").unwrap();
    }
    for outcome in &check.repairs {
        writeln!(
            summary,
            "  buyer {}: {} reassigned, {} unresolved",
            outcome.buyer_id,
            outcome.reassigned.len(),
            outcome.unresolved.len()
        )
        .unwrap();
    }
    if !check.residual_self_dealing_buyers.is_empty() {
        let ids: Vec<String> = check
            .residual_self_dealing_buyers
            .iter()
            .map(ToString::to_string)
            .collect();
        writeln!(summary, "  residual self-dealing buyers: {}", ids.join(", ")).unwrap();
    }
    for row in &check.balance_mismatches {
        writeln!(
            summary,
            "  balance mismatch: user {} (projection {}, ledger {})",
            row.user_id, row.balance_cents, row.ledger_cents
        )
        .unwrap();
    }
    if !check.reconciled_users.is_empty() {
        writeln!(
            summary,
            "  reconciled balances for {} users",
            check.reconciled_users.len()
        )
        .unwrap();
    }
    summary
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::balance::get_balance;
    use crate::entities::{OrderItem, Product, User, user};
    use crate::test_utils::*;
    use sea_orm::prelude::*;
    use std::path::PathBuf;

    fn seed_config(dir: &tempfile::TempDir) -> SeedConfig {
        SeedConfig {
            data_dir: PathBuf::from(dir.path()),
            repair_buyer_ids: Vec::new(),
            reconcile_balances: true,
        }
    }

    fn write_seed_file(dir: &tempfile::TempDir, name: &str, contents: &str) {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    fn full_fixture(dir: &tempfile::TempDir) {
        write_seed_file(
            dir,
            "Users.csv",
            "1,ann@example.com,Ann Archer,1 Main St,hash-a,2023-01-05 09:00:00,,\n\
             2,bo@example.com,Bo Birch,2 Oak Ave,hash-b,2023-02-06 10:00:00,,\n\
             3,cy@example.com,Cy Cedar,3 Elm Rd,hash-c,2023-03-07 11:00:00,,\n",
        );
        write_seed_file(
            dir,
            "Products.csv",
            "7,Copper Anvil,49.99,true\n8,Hemp Rope,8.00,false\n",
        );
        write_seed_file(dir, "AccountBalance.csv", "1,5000\n2,0\n");
        write_seed_file(
            dir,
            "BalanceTx.csv",
            "1,1,5000,2023-01-10 12:00:00,signup bonus\n",
        );
        write_seed_file(
            dir,
            "Orders.csv",
            "10,1,2023-06-01 08:00:00,9998,true\n11,2,2023-06-02 09:00:00,800,false\n",
        );
        write_seed_file(
            dir,
            "OrderItems.csv",
            "20,10,7,2,2,4999,2023-06-03 10:00:00\n21,11,8,3,1,800,\n",
        );
        write_seed_file(dir, "Inventory.csv", "2,7,12\n3,8,4\n");
        write_seed_file(
            dir,
            "ProductReviews.csv",
            "30,1,7,5,Rings true,2023-07-01 10:00:00,2023-07-01 10:00:00\n",
        );
        write_seed_file(
            dir,
            "SellerReviews.csv",
            "40,1,2,4,Quick to ship,2023-07-02 11:00:00,2023-07-02 12:00:00\n",
        );
        write_seed_file(dir, "ReviewVotes.csv", "2,30,1\n3,30,-1\n");
        write_seed_file(dir, "Purchases.csv", "50,1,7,2023-06-01 08:00:00\n");
        write_seed_file(dir, "Wishes.csv", "60,2,7,2023-05-01 07:00:00\n");
    }

    #[tokio::test]
    async fn test_load_dir_full_fixture() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();
        full_fixture(&dir);

        let report = load_dir(&db, &seed_config(&dir)).await?;
        assert_eq!(report.users, 3);
        assert_eq!(report.products, 2);
        assert_eq!(report.account_balances, 2);
        assert_eq!(report.balance_txs, 1);
        assert_eq!(report.orders, 2);
        assert_eq!(report.order_items, 2);
        assert_eq!(report.inventory, 2);
        assert_eq!(report.product_reviews, 1);
        assert_eq!(report.seller_reviews, 1);
        assert_eq!(report.review_votes, 2);
        assert_eq!(report.purchases, 1);
        assert_eq!(report.wishes, 1);
        assert!(report.skipped_files.is_empty());
        assert_eq!(report.total_rows(), 20);

        // Spot-check conversions and nulls landed correctly
        let anvil = Product::find_by_id(7).one(&db).await?.unwrap();
        assert_eq!(anvil.price_cents, 4999);
        assert!(anvil.available);

        let ann = User::find()
            .filter(user::Column::Email.eq("ann@example.com"))
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(ann.id, 1);
        assert_eq!(ann.created_at, ts("2023-01-05 09:00:00"));

        let fulfilled = OrderItem::find_by_id(20).one(&db).await?.unwrap();
        assert_eq!(fulfilled.fulfilled_at, Some(ts("2023-06-03 10:00:00")));
        let open = OrderItem::find_by_id(21).one(&db).await?.unwrap();
        assert_eq!(open.fulfilled_at, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_load_dir_skips_missing_files() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();
        write_seed_file(
            &dir,
            "Users.csv",
            "1,solo@example.com,Solo User,9 Lone St,hash,2023-01-01 00:00:00,,\n",
        );

        let report = load_dir(&db, &seed_config(&dir)).await?;
        assert_eq!(report.users, 1);
        assert_eq!(report.total_rows(), 1);
        assert_eq!(report.skipped_files.len(), 11);
        assert!(report.skipped_files.contains(&"Orders.csv".to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn test_load_dir_reports_malformed_row() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();
        write_seed_file(
            &dir,
            "Products.csv",
            "1,Fine Product,10.00,true\n2,Broken Product,ten dollars,true\n",
        );

        let result = load_dir(&db, &seed_config(&dir)).await;
        match result.unwrap_err() {
            Error::MalformedRow { file, line, message } => {
                assert_eq!(file, "Products.csv");
                assert_eq!(line, 2);
                assert!(message.contains("ten dollars"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_ids_advance_past_loaded_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();
        write_seed_file(
            &dir,
            "Users.csv",
            "1,a@example.com,A,1 St,h,2023-01-01 00:00:00,,\n\
             2,b@example.com,B,2 St,h,2023-01-01 00:00:00,,\n\
             5,e@example.com,E,5 St,h,2023-01-01 00:00:00,,\n",
        );

        load_dir(&db, &seed_config(&dir)).await?;
        advance_id_sequences(&db).await?;

        let next = create_test_user(&db, "next@example.com", "Next").await?;
        assert_eq!(next.id, 6);

        Ok(())
    }

    #[tokio::test]
    async fn test_post_load_check_repairs_configured_buyers() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();
        write_seed_file(
            &dir,
            "Users.csv",
            "1,buyer@example.com,Buyer,1 St,h,2023-01-01 00:00:00,,\n\
             2,low@example.com,Low,2 St,h,2023-01-01 00:00:00,,\n\
             3,high@example.com,High,3 St,h,2023-01-01 00:00:00,,\n",
        );
        write_seed_file(&dir, "Products.csv", "7,Anvil,10.00,true\n");
        write_seed_file(&dir, "Orders.csv", "1,1,2023-06-01 08:00:00,1000,true\n");
        // Buyer 1 recorded as the seller of their own purchase
        write_seed_file(&dir, "OrderItems.csv", "1,1,7,1,1,1000,\n");
        write_seed_file(&dir, "Inventory.csv", "2,7,5\n3,7,9\n");

        let mut config = seed_config(&dir);
        config.repair_buyer_ids = vec![1];
        load_dir(&db, &config).await?;

        let check = post_load_check(&db, &config).await?;
        assert!(check.is_consistent());
        assert_eq!(check.repairs.len(), 1);
        assert_eq!(check.repairs[0].reassigned.len(), 1);
        assert_eq!(check.repairs[0].reassigned[0].new_seller_id, 3);
        assert!(check.residual_self_dealing_buyers.is_empty());

        let item = OrderItem::find_by_id(1).one(&db).await?.unwrap();
        assert_eq!(item.seller_id, 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_post_load_check_reports_unconfigured_self_dealing() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();
        write_seed_file(
            &dir,
            "Users.csv",
            "1,a@example.com,A,1 St,h,2023-01-01 00:00:00,,\n\
             2,b@example.com,B,2 St,h,2023-01-01 00:00:00,,\n",
        );
        write_seed_file(&dir, "Products.csv", "7,Anvil,10.00,true\n");
        write_seed_file(&dir, "Orders.csv", "1,2,2023-06-01 08:00:00,1000,true\n");
        write_seed_file(&dir, "OrderItems.csv", "1,1,7,2,1,1000,\n");

        let config = seed_config(&dir);
        load_dir(&db, &config).await?;

        // Buyer 2 is dirty but not in repair_buyer_ids
        let check = post_load_check(&db, &config).await?;
        assert!(!check.is_consistent());
        assert_eq!(check.residual_self_dealing_buyers, vec![2]);

        Ok(())
    }

    #[tokio::test]
    async fn test_post_load_check_reconciles_balances() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();
        write_seed_file(
            &dir,
            "Users.csv",
            "1,a@example.com,A,1 St,h,2023-01-01 00:00:00,,\n",
        );
        // Projection claims 5000 but the ledger only backs 3000
        write_seed_file(&dir, "AccountBalance.csv", "1,5000\n");
        write_seed_file(
            &dir,
            "BalanceTx.csv",
            "1,1,2000,2023-01-02 00:00:00,deposit\n2,1,1000,2023-01-03 00:00:00,deposit\n",
        );

        let config = seed_config(&dir);
        load_dir(&db, &config).await?;

        let check = post_load_check(&db, &config).await?;
        assert!(check.is_consistent());
        assert_eq!(check.reconciled_users, vec![1]);
        assert!(check.balance_mismatches.is_empty());
        assert_eq!(get_balance(&db, 1).await?, 3000);

        Ok(())
    }

    #[tokio::test]
    async fn test_post_load_check_without_reconcile_reports_only() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();
        write_seed_file(
            &dir,
            "Users.csv",
            "1,a@example.com,A,1 St,h,2023-01-01 00:00:00,,\n",
        );
        write_seed_file(&dir, "AccountBalance.csv", "1,5000\n");
        write_seed_file(&dir, "BalanceTx.csv", "1,1,3000,2023-01-02 00:00:00,deposit\n");

        let mut config = seed_config(&dir);
        config.reconcile_balances = false;
        load_dir(&db, &config).await?;

        let check = post_load_check(&db, &config).await?;
        assert!(!check.is_consistent());
        assert_eq!(check.balance_mismatches.len(), 1);
        assert_eq!(check.balance_mismatches[0].balance_cents, 5000);
        assert_eq!(check.balance_mismatches[0].ledger_cents, 3000);
        assert!(check.reconciled_users.is_empty());
        // The projection was left alone
        assert_eq!(get_balance(&db, 1).await?, 5000);

        Ok(())
    }

    #[tokio::test]
    async fn test_batched_insert_handles_many_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();

        let mut users = String::new();
        for id in 1..=250 {
            users.push_str(&format!(
                "{id},u{id}@example.com,User {id},{id} Main St,h,2023-01-01 00:00:00,,\n"
            ));
        }
        write_seed_file(&dir, "Users.csv", &users);

        let report = load_dir(&db, &seed_config(&dir)).await?;
        assert_eq!(report.users, 250);
        assert_eq!(User::find().all(&db).await?.len(), 250);

        Ok(())
    }

    #[tokio::test]
    async fn test_format_summaries() -> Result<()> {
        let report = LoadReport {
            users: 3,
            products: 2,
            skipped_files: vec!["Wishes.csv".to_string()],
            ..Default::default()
        };
        let text = format_load_summary(&report);
        assert!(text.contains("Seed load: 5 rows"));
        assert!(text.contains("users: 3"));
        assert!(text.contains("skipped: Wishes.csv"));

        let check = LoadCheck {
            repairs: Vec::new(),
            residual_self_dealing_buyers: vec![4],
            balance_mismatches: vec![BalanceMismatchRow {
                user_id: 9,
                balance_cents: 100,
                ledger_cents: 90,
            }],
            reconciled_users: Vec::new(),
        };
        let text = format_check_summary(&check);
        assert!(text.contains("INCONSISTENT"));
        assert!(text.contains("residual self-dealing buyers: 4"));
        assert!(text.contains("user 9 (projection 100, ledger 90)"));

        Ok(())
    }
}
