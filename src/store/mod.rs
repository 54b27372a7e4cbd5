pub mod matched;
pub mod views;

pub use matched::MatchedAudienceStore;
pub use views::{ViewRetention, ViewStore};
