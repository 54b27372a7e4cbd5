#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use edgekit::audience::types::{
    AudienceDefinition, DocVector, MatchedAudience, PageFeatures, PageView, Query,
};
use edgekit::clock::ManualClock;
use edgekit::consent::StaticConsent;
use edgekit::storage::{
    read_json, MemoryStorage, Storage, MATCHED_AUDIENCES_KEY, MATCHED_AUDIENCE_IDS_KEY,
    PAGE_VIEWS_KEY,
};
use edgekit::store::ViewRetention;
use edgekit::{Edgekit, RunConfig};

/// 2023-11-14T22:13:20Z, far enough from zero that retention cutoffs are positive.
pub const START_MS: i64 = 1_700_000_000_000;
pub const DAY_MS: i64 = 86_400_000;

pub struct Harness {
    pub kit: Edgekit<StaticConsent>,
    pub storage: Arc<dyn Storage>,
    pub clock: ManualClock,
}

/// A fresh engine over isolated in-memory storage, with consent granted.
pub fn harness() -> Harness {
    harness_with(Arc::new(MemoryStorage::new()), StaticConsent::granted())
}

pub fn harness_with(storage: Arc<dyn Storage>, consent: StaticConsent) -> Harness {
    let clock = ManualClock::new(START_MS);
    let kit = Edgekit::new(
        Arc::clone(&storage),
        consent,
        Arc::new(clock.clone()),
        ViewRetention::default(),
    );
    Harness {
        kit,
        storage,
        clock,
    }
}

impl Harness {
    /// Run with the given page vector, skipping consent like a test page would.
    pub async fn run(&mut self, value: &[f64], audiences: &[AudienceDefinition]) -> edgekit::RunOutcome {
        self.kit
            .run(RunConfig {
                page_features: Some(page_features(value)),
                audience_definitions: audiences.to_vec(),
                omit_gdpr_consent: true,
            })
            .await
    }

    /// Clear storage out of band and resynchronize both stores.
    pub fn clear_store(&mut self) {
        self.storage.clear().unwrap();
        self.kit.view_store_mut().load();
        self.kit.matched_audience_store_mut().load();
    }

    pub fn page_views(&self) -> Vec<PageView> {
        read_json(&*self.storage, PAGE_VIEWS_KEY).unwrap_or_default()
    }

    /// Matched audiences as stored: a mapping, read back as a list of its values.
    pub fn matched_audiences(&self) -> Vec<MatchedAudience> {
        let stored: BTreeMap<String, MatchedAudience> =
            read_json(&*self.storage, MATCHED_AUDIENCES_KEY).unwrap_or_default();
        stored.into_values().collect()
    }

    pub fn matched_audience_ids(&self) -> Vec<String> {
        read_json(&*self.storage, MATCHED_AUDIENCE_IDS_KEY).unwrap_or_default()
    }
}

pub fn page_features(value: &[f64]) -> PageFeatures {
    PageFeatures {
        doc_vector: Some(DocVector {
            version: 1,
            value: value.to_vec(),
        }),
    }
}

pub fn make_audience_definition(id: &str, occurrences: u32, definition: Vec<Query>) -> AudienceDefinition {
    AudienceDefinition {
        id: id.to_string(),
        version: 1,
        occurrences,
        expires_in_days: 30.0,
        definition,
    }
}

pub fn make_cosine_similarity_query(vector: &[f64], threshold: f64) -> Query {
    Query::CosineSimilarity {
        vector: vector.to_vec(),
        threshold,
        feature_version: None,
    }
}

pub fn make_logistic_regression_query(vector: &[f64], bias: f64, threshold: f64) -> Query {
    Query::LogisticRegression {
        vector: vector.to_vec(),
        bias,
        threshold,
        feature_version: None,
    }
}
