pub mod doctor;
pub mod inspect;
pub mod reset;
pub mod run;

use anyhow::Result;
use std::sync::Arc;

use edgekit::config::EdgekitConfig;
use edgekit::storage::SqliteStorage;

/// Open the configured SQLite storage.
fn open_storage(config: &EdgekitConfig) -> Result<Arc<SqliteStorage>> {
    let db_path = config.resolved_db_path();
    let storage = SqliteStorage::open(&db_path)?;
    Ok(Arc::new(storage))
}
