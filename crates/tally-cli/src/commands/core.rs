//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Shared utility to resolve the config file
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{Database, TallyConfig};

/// Open (and migrate) the database at `db_path`
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// Load config from `--config`, the data dir override, or embedded defaults
pub fn load_config(path: Option<&Path>) -> Result<TallyConfig> {
    TallyConfig::load(path).context("Failed to load config")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create a group: tally group create --name Depto");
    println!("  2. Create users:   tally user create --name Ana");
    println!("  3. Add members:    tally member add --group <GROUP> --user <USER>");
    println!("  4. Analyze:        tally analyze text --group <GROUP> --user <USER> --text \"almuerzo 40\"");

    Ok(())
}
