pub mod engine;
pub mod query;
pub mod types;

pub use engine::{evaluate_definition, DefinitionError};
pub use query::QueryError;
pub use types::{AudienceDefinition, DocVector, MatchedAudience, PageFeatures, PageView, Query};
