//! CLI `doctor` command — run database diagnostics and print a health report.

use anyhow::{Context, Result};

use edgekit::config::EdgekitConfig;
use edgekit::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &EdgekitConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `edgekit run` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("edgekit Health Report");
    println!("=====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Stored keys:       {}", report.key_count);
    println!("Stored JSON:       {}", format_bytes(report.total_value_bytes.max(0) as u64));
    println!("Consent granted:   {}", config.consent.granted);
    println!("View retention:    {} days", config.views.retention_days);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.edgekit/edgekit.db");
        println!("  2. Or start over: edgekit reset --yes");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
