//! Seed-load configuration from seed.toml
//!
//! This module describes a bulk load run: where the CSV exports live, which
//! buyers get a self-dealing repair pass after loading, and whether balance
//! projections are reconciled against the ledger. Historical exports are
//! known to contain seed buyers with self-dealing order items, so those
//! buyer ids ship in the config rather than being hardcoded.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration structure representing the entire seed.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// Directory containing the CSV export files
    pub data_dir: PathBuf,
    /// Buyers to run a self-dealing repair pass for after loading
    #[serde(default)]
    pub repair_buyer_ids: Vec<i64>,
    /// Whether to recompute diverged balance projections from the ledger
    #[serde(default = "default_reconcile_balances")]
    pub reconcile_balances: bool,
}

fn default_reconcile_balances() -> bool {
    true
}

/// Loads seed configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the seed.toml file
///
/// # Returns
/// * `Ok(SeedConfig)` - Successfully parsed configuration
/// * `Err(Error)` - Failed to read or parse the configuration file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read seed config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse seed.toml: {e}"),
    })
}

/// Loads seed configuration from the default location (./seed.toml)
///
/// # Returns
/// * `Ok(SeedConfig)` - Successfully parsed configuration
/// * `Err(Error)` - Failed to read or parse the configuration file
pub fn load_default_config() -> Result<SeedConfig> {
    load_config("seed.toml")
}
