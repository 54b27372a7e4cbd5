//! Query scoring.
//!
//! Each [`Query`] variant scores a page's [`DocVector`] and compares the score
//! with its threshold. Scoring is pure; the only failure is a query whose
//! vector length differs from the page's.

use thiserror::Error;

use super::types::{DocVector, Query};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("dimension mismatch: query has {expected} dimensions, features have {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl Query {
    /// Score `features` against this query.
    ///
    /// Returns `Ok(None)` when the query is pinned to a feature version the
    /// view was not produced with, `Ok(Some(matched))` otherwise.
    pub fn evaluate(&self, features: &DocVector) -> Result<Option<bool>, QueryError> {
        if let Some(version) = self.feature_version() {
            if version != features.version {
                return Ok(None);
            }
        }

        let matched = match self {
            Query::CosineSimilarity {
                vector, threshold, ..
            } => cosine_similarity(vector, &features.value)? >= *threshold,
            Query::LogisticRegression {
                vector,
                bias,
                threshold,
                ..
            } => logistic_regression(vector, *bias, &features.value)? >= *threshold,
        };
        Ok(Some(matched))
    }

    /// The query's reference vector (cosine) or weights (logistic).
    pub fn vector(&self) -> &[f64] {
        match self {
            Query::CosineSimilarity { vector, .. } | Query::LogisticRegression { vector, .. } => {
                vector.as_slice()
            }
        }
    }

    pub fn threshold(&self) -> f64 {
        match self {
            Query::CosineSimilarity { threshold, .. }
            | Query::LogisticRegression { threshold, .. } => *threshold,
        }
    }

    pub fn feature_version(&self) -> Option<u32> {
        match self {
            Query::CosineSimilarity {
                feature_version, ..
            }
            | Query::LogisticRegression {
                feature_version, ..
            } => *feature_version,
        }
    }

    /// Short name used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Query::CosineSimilarity { .. } => "cosine_similarity",
            Query::LogisticRegression { .. } => "logistic_regression",
        }
    }
}

/// Cosine similarity of two equal-length vectors. A zero-magnitude vector
/// has similarity 0 with everything.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64, QueryError> {
    let dot = dot_product(a, b)?;
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

/// `sigmoid(weights · features + bias)`.
pub fn logistic_regression(weights: &[f64], bias: f64, features: &[f64]) -> Result<f64, QueryError> {
    Ok(sigmoid(dot_product(weights, features)? + bias))
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn dot_product(a: &[f64], b: &[f64]) -> Result<f64, QueryError> {
    if a.len() != b.len() {
        return Err(QueryError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}
