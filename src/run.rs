//! The run entry point.
//!
//! [`Edgekit::run`] processes one page: it waits for consent, resynchronizes
//! both stores, records the page's features, evaluates every not-yet-matched
//! audience definition against the full view history, and persists the new
//! matches. A bad definition is reported in [`RunOutcome::errors`] without
//! stopping the others, and storage trouble degrades to "no new matches".

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audience::engine::{evaluate_definition, DefinitionError};
use crate::audience::types::{AudienceDefinition, MatchedAudience, PageFeatures};
use crate::clock::Clock;
use crate::config::{days_to_ms, EdgekitConfig};
use crate::consent::ConsentGate;
use crate::storage::Storage;
use crate::store::{MatchedAudienceStore, ViewRetention, ViewStore};

/// Input to a single [`Edgekit::run`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    #[serde(default)]
    pub page_features: Option<PageFeatures>,
    #[serde(default)]
    pub audience_definitions: Vec<AudienceDefinition>,
    /// Skip the consent gate entirely.
    #[serde(default)]
    pub omit_gdpr_consent: bool,
}

/// A definition that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefinitionFailure {
    pub id: String,
    pub version: u32,
    #[serde(serialize_with = "serialize_display")]
    pub error: DefinitionError,
}

/// Result of a single [`Edgekit::run`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    /// Every unexpired match, including ones from earlier runs.
    pub matched_audiences: Vec<MatchedAudience>,
    pub errors: Vec<DefinitionFailure>,
    /// `false` when the run stopped at the consent gate.
    pub consented: bool,
}

impl RunOutcome {
    /// Matches produced by this run.
    pub fn new_matches(&self) -> impl Iterator<Item = &MatchedAudience> {
        self.matched_audiences
            .iter()
            .filter(|audience| audience.matched_on_current_page_view)
    }
}

/// Owns the stores and runs pages through them.
pub struct Edgekit<C> {
    consent: C,
    clock: Arc<dyn Clock>,
    view_store: ViewStore,
    matched_audience_store: MatchedAudienceStore,
}

impl<C: ConsentGate> Edgekit<C> {
    pub fn new(
        storage: Arc<dyn Storage>,
        consent: C,
        clock: Arc<dyn Clock>,
        retention: ViewRetention,
    ) -> Self {
        let view_store = ViewStore::new(Arc::clone(&storage), Arc::clone(&clock), retention);
        let matched_audience_store = MatchedAudienceStore::new(storage, Arc::clone(&clock));
        Self {
            consent,
            clock,
            view_store,
            matched_audience_store,
        }
    }

    /// Build from configuration, taking retention from `[views]`.
    pub fn from_config(
        storage: Arc<dyn Storage>,
        consent: C,
        clock: Arc<dyn Clock>,
        config: &EdgekitConfig,
    ) -> Self {
        let retention = ViewRetention {
            max_age_ms: config.retention_ms(),
            max_views: config.views.max_page_views,
        };
        Self::new(storage, consent, clock, retention)
    }

    pub fn view_store(&self) -> &ViewStore {
        &self.view_store
    }

    pub fn view_store_mut(&mut self) -> &mut ViewStore {
        &mut self.view_store
    }

    pub fn matched_audience_store(&self) -> &MatchedAudienceStore {
        &self.matched_audience_store
    }

    pub fn matched_audience_store_mut(&mut self) -> &mut MatchedAudienceStore {
        &mut self.matched_audience_store
    }

    /// Process one page.
    pub async fn run(&mut self, config: RunConfig) -> RunOutcome {
        if !config.omit_gdpr_consent && !self.consent.consent_granted().await {
            tracing::debug!("consent not granted, skipping run");
            return RunOutcome::default();
        }

        self.view_store.load();
        self.matched_audience_store.load();

        if let Some(doc_vector) = config.page_features.and_then(|features| features.doc_vector) {
            self.view_store.insert(doc_vector);
        }

        let now = self.clock.now_ms();
        let page_views = self.view_store.list();
        let mut seen = HashSet::new();
        let mut new_matches = Vec::new();
        let mut errors = Vec::new();

        for definition in &config.audience_definitions {
            if !seen.insert((definition.id.as_str(), definition.version)) {
                continue;
            }
            if self
                .matched_audience_store
                .is_matched(&definition.id, definition.version)
            {
                continue;
            }

            match evaluate_definition(definition, page_views) {
                Ok(true) => new_matches.push(MatchedAudience {
                    id: definition.id.clone(),
                    version: definition.version,
                    matched_at: now,
                    expires_at: now.saturating_add(days_to_ms(definition.expires_in_days)),
                    matched_on_current_page_view: true,
                }),
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(
                        audience = %definition.id,
                        version = definition.version,
                        error = %error,
                        "skipping invalid audience definition"
                    );
                    errors.push(DefinitionFailure {
                        id: definition.id.clone(),
                        version: definition.version,
                        error,
                    });
                }
            }
        }

        tracing::debug!(
            page_views = page_views.len(),
            definitions = config.audience_definitions.len(),
            new_matches = new_matches.len(),
            errors = errors.len(),
            "run complete"
        );

        self.matched_audience_store.set_audiences(new_matches);

        RunOutcome {
            matched_audiences: self.matched_audience_store.get_matched_audiences(),
            errors,
            consented: true,
        }
    }
}

fn serialize_display<S: serde::Serializer>(
    error: &DefinitionError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
