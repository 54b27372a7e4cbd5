mod helpers;

use std::collections::BTreeMap;
use std::sync::Arc;

use edgekit::audience::types::MatchedAudience;
use edgekit::clock::ManualClock;
use edgekit::storage::{
    read_json, MemoryStorage, Storage, MATCHED_AUDIENCES_KEY, MATCHED_AUDIENCE_IDS_KEY,
};
use edgekit::store::MatchedAudienceStore;
use helpers::{DAY_MS, START_MS};

fn store_over(storage: &Arc<MemoryStorage>, clock: &ManualClock) -> MatchedAudienceStore {
    MatchedAudienceStore::new(storage.clone(), Arc::new(clock.clone()))
}

fn matched_audience(id: &str) -> MatchedAudience {
    MatchedAudience {
        id: id.to_string(),
        version: 1,
        matched_at: START_MS,
        expires_at: START_MS + 30 * DAY_MS,
        matched_on_current_page_view: true,
    }
}

#[test]
fn loads_empty_from_fresh_storage() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = ManualClock::new(START_MS);
    let store = store_over(&storage, &clock);

    assert!(store.get_matched_audiences().is_empty());
    assert!(store.matched_ids().is_empty());
}

#[test]
fn sets_and_persists_audiences() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = ManualClock::new(START_MS);
    let mut store = store_over(&storage, &clock);

    store.set_audiences(vec![matched_audience("id")]);

    let audiences = store.get_matched_audiences();
    assert_eq!(audiences.len(), 1);
    assert_eq!(audiences[0], matched_audience("id"));

    let stored: BTreeMap<String, MatchedAudience> =
        read_json(&*storage, MATCHED_AUDIENCES_KEY).unwrap();
    assert_eq!(stored.keys().collect::<Vec<_>>(), vec!["id"]);
    let ids: Vec<String> = read_json(&*storage, MATCHED_AUDIENCE_IDS_KEY).unwrap();
    assert_eq!(ids, vec!["id"]);
}

#[test]
fn reports_matched_by_id_and_version() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = ManualClock::new(START_MS);
    let mut store = store_over(&storage, &clock);
    store.set_audiences(vec![matched_audience("id")]);

    assert!(store.is_matched("id", 1));
    assert!(!store.is_matched("id", 999));
    assert!(!store.is_matched("new-id", 1));
}

#[test]
fn second_store_sees_persisted_matches() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = ManualClock::new(START_MS);
    store_over(&storage, &clock).set_audiences(vec![matched_audience("a"), matched_audience("b")]);

    let reopened = store_over(&storage, &clock);
    let audiences = reopened.get_matched_audiences();
    assert_eq!(audiences.len(), 2);
    assert!(audiences.iter().all(|a| !a.matched_on_current_page_view));
    assert_eq!(reopened.matched_ids(), vec!["a", "b"]);
}

#[test]
fn expired_records_are_evicted_on_load() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = ManualClock::new(START_MS);
    let mut short = matched_audience("short");
    short.expires_at = START_MS + DAY_MS;
    store_over(&storage, &clock).set_audiences(vec![short, matched_audience("long")]);

    clock.advance(2 * DAY_MS);
    let store = store_over(&storage, &clock);

    assert_eq!(store.matched_ids(), vec!["long"]);
    let stored: BTreeMap<String, MatchedAudience> =
        read_json(&*storage, MATCHED_AUDIENCES_KEY).unwrap();
    assert!(!stored.contains_key("short"));
    let ids: Vec<String> = read_json(&*storage, MATCHED_AUDIENCE_IDS_KEY).unwrap();
    assert_eq!(ids, vec!["long"]);
}

#[test]
fn garbage_in_storage_loads_as_empty() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set(MATCHED_AUDIENCES_KEY, "{not json").unwrap();
    let clock = ManualClock::new(START_MS);
    let mut store = store_over(&storage, &clock);

    assert!(store.get_matched_audiences().is_empty());

    store.set_audiences(vec![matched_audience("id")]);
    assert!(store.is_matched("id", 1));
}
