use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;

use edgekit::audience::types::MatchedAudience;
use edgekit::clock::SystemClock;
use edgekit::config::EdgekitConfig;
use edgekit::store::{MatchedAudienceStore, ViewRetention, ViewStore};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchedReport {
    matched_audiences: Vec<MatchedAudience>,
    matched_audience_ids: Vec<String>,
}

/// Print the stored page views as JSON.
pub fn views(config: &EdgekitConfig) -> Result<()> {
    let storage = super::open_storage(config)?;
    let retention = ViewRetention {
        max_age_ms: config.retention_ms(),
        max_views: config.views.max_page_views,
    };
    let store = ViewStore::new(storage, Arc::new(SystemClock), retention);

    println!("{}", serde_json::to_string_pretty(store.list())?);
    eprintln!("{} page views.", store.len());
    Ok(())
}

/// Print the current (unexpired) audience matches as JSON.
pub fn matched(config: &EdgekitConfig) -> Result<()> {
    let storage = super::open_storage(config)?;
    let store = MatchedAudienceStore::new(storage, Arc::new(SystemClock));

    let report = MatchedReport {
        matched_audiences: store.get_matched_audiences(),
        matched_audience_ids: store.matched_ids(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    eprintln!("{} matched audiences.", report.matched_audiences.len());
    Ok(())
}
