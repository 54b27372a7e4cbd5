//! Key-value persistence behind the stores.
//!
//! The stores only need string keys holding JSON text. [`Storage`] is that
//! capability; [`MemoryStorage`] keeps it in process and [`SqliteStorage`]
//! keeps it in the `kv` table of a SQLite file. The JSON helpers treat
//! unreadable or malformed values as absent. The collection readers go one
//! level further and drop only the elements that fail to decode, so a single
//! bad entry costs that entry and not the whole collection.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Ordered sequence of recorded page views.
pub const PAGE_VIEWS_KEY: &str = "page-views";
/// Mapping from audience id to its match record.
pub const MATCHED_AUDIENCES_KEY: &str = "matched-audiences";
/// Flat list of matched audience ids, kept in sync with [`MATCHED_AUDIENCES_KEY`].
pub const MATCHED_AUDIENCE_IDS_KEY: &str = "matched-audience-ids";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage lock poisoned")]
    Poisoned,
}

/// String-keyed persistence for JSON documents.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Read and decode a JSON value. Missing, unreadable and malformed entries all
/// come back as `None`.
pub fn read_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read stored value, treating as empty");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding malformed stored value");
            None
        }
    }
}

/// Read a JSON array, keeping every element that decodes as `T`. Elements
/// that do not are dropped one at a time; a value that is not an array at
/// all reads as empty.
pub fn read_json_list<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Vec<T> {
    let Some(entries) = read_json::<Vec<serde_json::Value>>(storage, key) else {
        return Vec::new();
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, index, error = %e, "discarding malformed stored entry");
                None
            }
        })
        .collect()
}

/// Read a JSON object, keeping every member whose value decodes as `T`.
pub fn read_json_map<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> BTreeMap<String, T> {
    let Some(entries) = read_json::<BTreeMap<String, serde_json::Value>>(storage, key) else {
        return BTreeMap::new();
    };

    entries
        .into_iter()
        .filter_map(|(id, entry)| match serde_json::from_value(entry) {
            Ok(value) => Some((id, value)),
            Err(e) => {
                tracing::warn!(key, entry = %id, error = %e, "discarding malformed stored entry");
                None
            }
        })
        .collect()
}

/// Encode a value as JSON and store it under `key`.
pub fn write_json<T: Serialize + ?Sized>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, &raw)
}
