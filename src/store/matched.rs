//! Matched-audience records.
//!
//! [`MatchedAudienceStore`] keeps one [`MatchedAudience`] per audience id,
//! persisted as a JSON object under [`MATCHED_AUDIENCES_KEY`] with a flat id
//! list under [`MATCHED_AUDIENCE_IDS_KEY`] for callers that only need to know
//! *which* audiences matched. Expired records are invisible to every read and
//! are dropped from storage on the next load or write.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::audience::types::MatchedAudience;
use crate::clock::Clock;
use crate::storage::{
    read_json_map, write_json, Storage, StorageError, MATCHED_AUDIENCES_KEY, MATCHED_AUDIENCE_IDS_KEY,
};

pub struct MatchedAudienceStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    audiences: BTreeMap<String, MatchedAudience>,
}

impl MatchedAudienceStore {
    /// Create a store and load whatever is already persisted.
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        let mut store = Self {
            storage,
            clock,
            audiences: BTreeMap::new(),
        };
        store.load();
        store
    }

    /// Re-read persisted matches, dropping expired ones. Every loaded record
    /// is marked as not matched on the current page view.
    pub fn load(&mut self) {
        let now = self.clock.now_ms();
        let stored: BTreeMap<String, MatchedAudience> =
            read_json_map(self.storage.as_ref(), MATCHED_AUDIENCES_KEY);

        let before = stored.len();
        self.audiences = stored
            .into_iter()
            .filter(|(_, audience)| !audience.is_expired(now))
            .map(|(id, mut audience)| {
                audience.matched_on_current_page_view = false;
                (id, audience)
            })
            .collect();

        let evicted = before - self.audiences.len();
        if evicted > 0 {
            tracing::info!(evicted, "evicted expired audience matches");
            self.save();
        }
    }

    /// Whether an unexpired match exists for exactly this id and version.
    pub fn is_matched(&self, id: &str, version: u32) -> bool {
        let now = self.clock.now_ms();
        self.audiences
            .get(id)
            .is_some_and(|audience| audience.version == version && !audience.is_expired(now))
    }

    /// Merge new matches in. An existing record is only replaced when it has
    /// expired or belongs to a different version of the audience.
    pub fn set_audiences(&mut self, audiences: Vec<MatchedAudience>) {
        if audiences.is_empty() {
            return;
        }

        let now = self.clock.now_ms();
        for audience in audiences {
            let replace = match self.audiences.get(&audience.id) {
                Some(existing) => existing.is_expired(now) || existing.version != audience.version,
                None => true,
            };
            if replace {
                tracing::info!(
                    audience = %audience.id,
                    version = audience.version,
                    expires_at = audience.expires_at,
                    "audience matched"
                );
                self.audiences.insert(audience.id.clone(), audience);
            }
        }

        self.audiences.retain(|_, audience| !audience.is_expired(now));
        self.save();
    }

    /// All unexpired matches, oldest match first.
    pub fn get_matched_audiences(&self) -> Vec<MatchedAudience> {
        let now = self.clock.now_ms();
        let mut audiences: Vec<MatchedAudience> = self
            .audiences
            .values()
            .filter(|audience| !audience.is_expired(now))
            .cloned()
            .collect();
        audiences.sort_by(|a, b| a.matched_at.cmp(&b.matched_at).then_with(|| a.id.cmp(&b.id)));
        audiences
    }

    /// Ids of all unexpired matches, in id order.
    pub fn matched_ids(&self) -> Vec<String> {
        let now = self.clock.now_ms();
        self.audiences
            .values()
            .filter(|audience| !audience.is_expired(now))
            .map(|audience| audience.id.clone())
            .collect()
    }

    /// Drop every match, in memory and in storage.
    pub fn clear(&mut self) {
        self.audiences.clear();
        let result = self
            .storage
            .remove(MATCHED_AUDIENCES_KEY)
            .and_then(|_| self.storage.remove(MATCHED_AUDIENCE_IDS_KEY));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to clear matched audiences");
        }
    }

    fn save(&self) {
        if let Err(e) = self.try_save() {
            tracing::warn!(error = %e, "failed to persist matched audiences");
        }
    }

    fn try_save(&self) -> Result<(), StorageError> {
        let ids: Vec<&str> = self.audiences.keys().map(String::as_str).collect();
        write_json(self.storage.as_ref(), MATCHED_AUDIENCES_KEY, &self.audiences)?;
        write_json(self.storage.as_ref(), MATCHED_AUDIENCE_IDS_KEY, &ids)
    }
}
