//! `bazaar-load` - seeds a marketplace database from CSV exports.
//!
//! Reads `seed.toml` (or the path given as the first argument), creates the
//! schema, bulk-loads every seed file present in the configured directory,
//! then runs the post-load repair and consistency checks.

use bazaar_data::{
    config::{database, seed},
    errors::Result,
    loader,
};
use dotenvy::dotenv;
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Seed configuration, from the first argument or ./seed.toml
    let config = match env::args().nth(1) {
        Some(path) => seed::load_config(path),
        None => seed::load_default_config(),
    }
    .inspect_err(|e| error!("Failed to load seed configuration: {}", e))?;
    info!("Loading seed data from {}", config.data_dir.display());

    // 4. Connect and create the schema
    let db = database::create_connection()
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;
    database::create_indexes(&db).await?;

    // 5. Bulk load
    let report = loader::load_dir(&db, &config)
        .await
        .inspect_err(|e| error!("Seed load failed: {}", e))?;
    info!("{}", loader::format_load_summary(&report).trim_end());

    // 6. Advance identity sequences past the explicit ids
    loader::advance_id_sequences(&db).await?;

    // 7. Repair and verify
    let check = loader::post_load_check(&db, &config).await?;
    info!("{}", loader::format_check_summary(&check).trim_end());
    if !check.is_consistent() {
        warn!("Loaded data failed the post-load consistency check");
    }

    Ok(())
}
