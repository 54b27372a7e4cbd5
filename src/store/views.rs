//! Page-view history.
//!
//! [`ViewStore`] keeps the visitor's recorded page views in chronological
//! order under [`PAGE_VIEWS_KEY`]. Views older than the retention window are
//! pruned on every load and record, and an optional cap keeps only the newest
//! views. Persistence failures are logged, never returned.

use std::sync::Arc;

use crate::audience::types::{DocVector, PageView};
use crate::clock::Clock;
use crate::storage::{read_json_list, write_json, Storage, PAGE_VIEWS_KEY};

/// Retention settings for [`ViewStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRetention {
    /// Views older than this many milliseconds are dropped.
    pub max_age_ms: i64,
    /// Keep at most this many of the newest views.
    pub max_views: Option<usize>,
}

impl Default for ViewRetention {
    fn default() -> Self {
        Self {
            max_age_ms: crate::config::days_to_ms(30.0),
            max_views: None,
        }
    }
}

pub struct ViewStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    retention: ViewRetention,
    page_views: Vec<PageView>,
}

impl ViewStore {
    /// Create a store and load whatever is already persisted.
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, retention: ViewRetention) -> Self {
        let mut store = Self {
            storage,
            clock,
            retention,
            page_views: Vec::new(),
        };
        store.load();
        store
    }

    /// Re-read the persisted history, dropping malformed entries and putting
    /// the rest back in timestamp order.
    pub fn load(&mut self) {
        self.page_views = read_json_list(self.storage.as_ref(), PAGE_VIEWS_KEY);
        self.page_views.sort_by_key(|view| view.timestamp);
        self.prune();
    }

    /// Current history, oldest first.
    pub fn list(&self) -> &[PageView] {
        &self.page_views
    }

    pub fn len(&self) -> usize {
        self.page_views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.page_views.is_empty()
    }

    /// Record a view of a page with the given features, stamped with the current time.
    pub fn insert(&mut self, doc_vector: DocVector) {
        let timestamp = self.clock.now_ms();
        self.record(PageView {
            doc_vector,
            timestamp,
        });
    }

    /// Append a view, prune, and persist. A view stamped earlier than the last
    /// recorded one is moved up to it so the history stays chronological.
    pub fn record(&mut self, mut page_view: PageView) {
        if let Some(last) = self.page_views.last() {
            if page_view.timestamp < last.timestamp {
                tracing::debug!(
                    timestamp = page_view.timestamp,
                    last = last.timestamp,
                    "clamping out-of-order page view"
                );
                page_view.timestamp = last.timestamp;
            }
        }

        self.page_views.push(page_view);
        self.prune();
        self.save();
    }

    /// Drop all views, in memory and in storage.
    pub fn clear(&mut self) {
        self.page_views.clear();
        if let Err(e) = self.storage.remove(PAGE_VIEWS_KEY) {
            tracing::warn!(error = %e, "failed to clear page views");
        }
    }

    fn prune(&mut self) {
        let before = self.page_views.len();
        let cutoff = self.clock.now_ms().saturating_sub(self.retention.max_age_ms);
        self.page_views.retain(|view| view.timestamp >= cutoff);

        if let Some(max) = self.retention.max_views {
            let excess = self.page_views.len().saturating_sub(max);
            self.page_views.drain(..excess);
        }

        let pruned = before - self.page_views.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = self.page_views.len(), "pruned page views");
        }
    }

    fn save(&self) {
        if let Err(e) = write_json(self.storage.as_ref(), PAGE_VIEWS_KEY, &self.page_views) {
            tracing::warn!(error = %e, "failed to persist page views");
        }
    }
}
