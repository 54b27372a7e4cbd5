//! CLI `run` command — process one page against a set of audience definitions.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use edgekit::audience::types::{AudienceDefinition, PageFeatures};
use edgekit::clock::SystemClock;
use edgekit::config::EdgekitConfig;
use edgekit::consent::StaticConsent;
use edgekit::{Edgekit, RunConfig};

/// Run one page through the engine and print the outcome as JSON.
pub async fn run(
    config: &EdgekitConfig,
    audiences: &Path,
    features: Option<&Path>,
    omit_consent: bool,
) -> Result<()> {
    let json = std::fs::read_to_string(audiences)
        .with_context(|| format!("failed to read audiences file: {}", audiences.display()))?;
    let audience_definitions: Vec<AudienceDefinition> =
        serde_json::from_str(&json).context("failed to parse audience definitions")?;

    let page_features = features
        .map(|path| -> Result<PageFeatures> {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read features file: {}", path.display()))?;
            serde_json::from_str(&json).context("failed to parse page features")
        })
        .transpose()?;

    let storage = super::open_storage(config)?;
    let mut kit = Edgekit::from_config(
        storage,
        StaticConsent(config.consent.granted),
        Arc::new(SystemClock),
        config,
    );

    let outcome = kit
        .run(RunConfig {
            page_features,
            audience_definitions,
            omit_gdpr_consent: omit_consent,
        })
        .await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.consented {
        eprintln!("Consent not granted; nothing was recorded. Set [consent] granted = true or pass --omit-consent.");
    } else {
        eprintln!(
            "{} page views stored, {} audiences matched ({} new), {} definition errors.",
            kit.view_store().len(),
            outcome.matched_audiences.len(),
            outcome.new_matches().count(),
            outcome.errors.len()
        );
    }

    Ok(())
}
