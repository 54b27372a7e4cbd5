//! Audience and page-view type definitions.
//!
//! Defines [`PageView`] (a recorded visit), [`Query`] (a scoring rule),
//! [`AudienceDefinition`] (the caller's segment rules), and [`MatchedAudience`]
//! (the persisted outcome). Field names serialize in camelCase, matching the
//! stored JSON documents.

use serde::{Deserialize, Serialize};

/// A version-tagged feature vector describing one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocVector {
    /// Version of the feature model that produced `value`.
    pub version: u32,
    pub value: Vec<f64>,
}

/// Features extracted from the page being processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFeatures {
    pub doc_vector: Option<DocVector>,
}

/// A recorded page visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub doc_vector: DocVector,
    /// Epoch milliseconds at which the view was recorded.
    pub timestamp: i64,
}

/// A scoring rule applied to each page view's feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Query {
    /// Matches when the cosine similarity to `vector` reaches `threshold`.
    #[serde(rename_all = "camelCase")]
    CosineSimilarity {
        vector: Vec<f64>,
        threshold: f64,
        /// Only score views whose doc vector has this version.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feature_version: Option<u32>,
    },
    /// Matches when `sigmoid(vector · features + bias)` reaches `threshold`.
    #[serde(rename_all = "camelCase")]
    LogisticRegression {
        vector: Vec<f64>,
        bias: f64,
        threshold: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feature_version: Option<u32>,
    },
}

/// A caller-supplied audience segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceDefinition {
    pub id: String,
    pub version: u32,
    /// How many page views each query must match.
    pub occurrences: u32,
    /// Lifetime of a match, in (possibly fractional) days.
    pub expires_in_days: f64,
    pub definition: Vec<Query>,
}

/// The persisted record that an audience definition was satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedAudience {
    pub id: String,
    pub version: u32,
    /// Epoch milliseconds of the match.
    pub matched_at: i64,
    /// Epoch milliseconds after which the match no longer counts.
    pub expires_at: i64,
    /// `true` only when the current run produced the match.
    pub matched_on_current_page_view: bool,
}

impl MatchedAudience {
    /// Expired once `expires_at` is in the past. A record is still live at
    /// the exact millisecond it expires.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at < now_ms
    }
}
