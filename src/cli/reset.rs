//! CLI `reset` command — delete all page views and matches after user confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use edgekit::config::EdgekitConfig;
use edgekit::storage::Storage;

/// Delete all stored state after user confirmation.
pub fn reset(config: &EdgekitConfig, skip_confirmation: bool) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !skip_confirmation {
        println!("WARNING: This will permanently delete ALL page views and audience matches.");
        println!("Database: {}", db_path.display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("reset cancelled");
        }
    }

    let storage = super::open_storage(config)?;
    storage.clear()?;

    println!("All page views and matches deleted. Reset complete.");
    Ok(())
}
