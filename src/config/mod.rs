/// Database configuration and connection management
pub mod database;

/// Seed-load configuration from seed.toml
pub mod seed;
