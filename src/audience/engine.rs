//! Audience definition evaluation over a page-view history.
//!
//! Each query's occurrence count is taken independently across the whole
//! history, so different views may satisfy different queries. A definition
//! matches when every query reaches `occurrences`, and the views that
//! satisfied any query outnumber `occurrences`. The second condition means a
//! single qualifying visit never matches on its own: with `occurrences = 1`
//! the visitor must be seen qualifying twice.

use thiserror::Error;

use super::query::QueryError;
use super::types::{AudienceDefinition, PageView, Query};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("audience id must not be empty")]
    EmptyId,
    #[error("occurrences must be at least 1")]
    ZeroOccurrences,
    #[error("expiresInDays must be a finite, non-negative number (got {0})")]
    InvalidExpiry(f64),
    #[error("definition has no queries")]
    NoQueries,
    #[error("query {index} has an empty vector")]
    EmptyVector { index: usize },
    #[error("query {index} has a non-finite {field}")]
    NonFinite { index: usize, field: &'static str },
    #[error("query {index} ({kind}): {source}")]
    Query {
        index: usize,
        kind: &'static str,
        #[source]
        source: QueryError,
    },
}

impl AudienceDefinition {
    /// Check the definition's shape before it is scored.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.id.is_empty() {
            return Err(DefinitionError::EmptyId);
        }
        if self.occurrences == 0 {
            return Err(DefinitionError::ZeroOccurrences);
        }
        if !self.expires_in_days.is_finite() || self.expires_in_days < 0.0 {
            return Err(DefinitionError::InvalidExpiry(self.expires_in_days));
        }
        if self.definition.is_empty() {
            return Err(DefinitionError::NoQueries);
        }

        for (index, query) in self.definition.iter().enumerate() {
            if query.vector().is_empty() {
                return Err(DefinitionError::EmptyVector { index });
            }
            if query.vector().iter().any(|x| !x.is_finite()) {
                return Err(DefinitionError::NonFinite {
                    index,
                    field: "vector",
                });
            }
            if !query.threshold().is_finite() {
                return Err(DefinitionError::NonFinite {
                    index,
                    field: "threshold",
                });
            }
            if let Query::LogisticRegression { bias, .. } = query {
                if !bias.is_finite() {
                    return Err(DefinitionError::NonFinite {
                        index,
                        field: "bias",
                    });
                }
            }
        }

        Ok(())
    }
}

/// Per-definition occurrence counts, returned for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrences {
    /// Satisfying-view count for each query, in definition order.
    pub per_query: Vec<u32>,
    /// Views that satisfied at least one query.
    pub qualifying_views: u32,
}

impl Occurrences {
    pub fn satisfies(&self, required: u32) -> bool {
        self.per_query.iter().all(|&count| count >= required) && self.qualifying_views > required
    }
}

/// Count, for each query, how many views in `views` satisfy it.
pub fn count_occurrences(
    queries: &[Query],
    views: &[PageView],
) -> Result<Occurrences, DefinitionError> {
    let mut per_query = vec![0u32; queries.len()];
    let mut qualifying_views = 0u32;

    for view in views {
        let mut qualified = false;
        for (index, query) in queries.iter().enumerate() {
            let matched = query
                .evaluate(&view.doc_vector)
                .map_err(|source| DefinitionError::Query {
                    index,
                    kind: query.kind(),
                    source,
                })?;
            if matched == Some(true) {
                per_query[index] += 1;
                qualified = true;
            }
        }
        if qualified {
            qualifying_views += 1;
        }
    }

    Ok(Occurrences {
        per_query,
        qualifying_views,
    })
}

/// Validate `definition` and decide whether `views` satisfy it.
pub fn evaluate_definition(
    definition: &AudienceDefinition,
    views: &[PageView],
) -> Result<bool, DefinitionError> {
    definition.validate()?;
    let occurrences = count_occurrences(&definition.definition, views)?;
    let matched = occurrences.satisfies(definition.occurrences);

    tracing::debug!(
        audience = %definition.id,
        version = definition.version,
        per_query = ?occurrences.per_query,
        qualifying_views = occurrences.qualifying_views,
        required = definition.occurrences,
        matched,
        "evaluated audience definition"
    );

    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audience::types::DocVector;

    const VECTOR_ONE: [f64; 3] = [1.0, 1.0, 1.0];
    const VECTOR_TWO: [f64; 3] = [1.0, 0.0, 1.0];
    const NOT_MATCHING: [f64; 3] = [0.0, 1.0, 0.0];

    fn view(value: &[f64], timestamp: i64) -> PageView {
        PageView {
            doc_vector: DocVector {
                version: 1,
                value: value.to_vec(),
            },
            timestamp,
        }
    }

    fn cosine(vector: &[f64]) -> Query {
        Query::CosineSimilarity {
            vector: vector.to_vec(),
            threshold: 0.99,
            feature_version: None,
        }
    }

    fn definition(queries: Vec<Query>, occurrences: u32) -> AudienceDefinition {
        AudienceDefinition {
            id: "audience".into(),
            version: 1,
            occurrences,
            expires_in_days: 30.0,
            definition: queries,
        }
    }

    #[test]
    fn single_query_needs_a_repeat_visit() {
        let def = definition(vec![cosine(&VECTOR_ONE)], 1);
        assert!(!evaluate_definition(&def, &[view(&VECTOR_ONE, 1)]).unwrap());
        assert!(evaluate_definition(&def, &[view(&VECTOR_ONE, 1), view(&VECTOR_ONE, 2)]).unwrap());
    }

    #[test]
    fn multi_query_counts_are_independent() {
        let def = definition(vec![cosine(&VECTOR_ONE), cosine(&VECTOR_TWO)], 1);
        let views = [view(&VECTOR_ONE, 1), view(&VECTOR_TWO, 2)];

        let counts = count_occurrences(&def.definition, &views).unwrap();
        assert_eq!(counts.per_query, vec![1, 1]);
        assert_eq!(counts.qualifying_views, 2);
        assert!(evaluate_definition(&def, &views).unwrap());
    }

    #[test]
    fn multi_query_requires_every_query() {
        let def = definition(vec![cosine(&VECTOR_ONE), cosine(&VECTOR_TWO)], 1);
        let views = [view(&VECTOR_ONE, 1), view(&VECTOR_ONE, 2), view(&VECTOR_ONE, 3)];
        assert!(!evaluate_definition(&def, &views).unwrap());
    }

    #[test]
    fn non_matching_views_never_qualify() {
        let def = definition(vec![cosine(&VECTOR_ONE), cosine(&VECTOR_TWO)], 1);
        let views: Vec<_> = (0..5).map(|ts| view(&NOT_MATCHING, ts)).collect();
        let counts = count_occurrences(&def.definition, &views).unwrap();
        assert_eq!(counts.per_query, vec![0, 0]);
        assert_eq!(counts.qualifying_views, 0);
        assert!(!evaluate_definition(&def, &views).unwrap());
    }

    #[test]
    fn higher_occurrence_threshold() {
        let def = definition(vec![cosine(&VECTOR_ONE)], 2);
        let two = [view(&VECTOR_ONE, 1), view(&VECTOR_ONE, 2)];
        let three = [view(&VECTOR_ONE, 1), view(&VECTOR_ONE, 2), view(&VECTOR_ONE, 3)];
        assert!(!evaluate_definition(&def, &two).unwrap());
        assert!(evaluate_definition(&def, &three).unwrap());
    }

    #[test]
    fn empty_history_does_not_match() {
        let def = definition(vec![cosine(&VECTOR_ONE)], 1);
        assert!(!evaluate_definition(&def, &[]).unwrap());
    }

    #[test]
    fn dimension_mismatch_is_a_definition_error() {
        let def = definition(vec![cosine(&[1.0, 1.0])], 1);
        let err = evaluate_definition(&def, &[view(&VECTOR_ONE, 1)]).unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::Query {
                index: 0,
                kind: "cosine_similarity",
                source: QueryError::DimensionMismatch { expected: 2, got: 3 },
            }
        ));
    }

    #[test]
    fn validate_rejects_malformed_definitions() {
        let mut def = definition(vec![cosine(&VECTOR_ONE)], 0);
        assert_eq!(def.validate(), Err(DefinitionError::ZeroOccurrences));

        def.occurrences = 1;
        def.expires_in_days = f64::NAN;
        assert!(matches!(def.validate(), Err(DefinitionError::InvalidExpiry(_))));

        def.expires_in_days = 1.0;
        def.definition.clear();
        assert_eq!(def.validate(), Err(DefinitionError::NoQueries));

        def.definition.push(cosine(&[]));
        assert_eq!(def.validate(), Err(DefinitionError::EmptyVector { index: 0 }));

        def.definition[0] = Query::LogisticRegression {
            vector: vec![1.0],
            bias: f64::INFINITY,
            threshold: 0.5,
            feature_version: None,
        };
        assert_eq!(
            def.validate(),
            Err(DefinitionError::NonFinite {
                index: 0,
                field: "bias"
            })
        );

        def.id.clear();
        assert_eq!(def.validate(), Err(DefinitionError::EmptyId));
    }
}
