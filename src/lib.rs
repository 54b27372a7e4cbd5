//! On-device audience classification.
//!
//! edgekit watches a visitor's page views, scores each page's feature vector
//! against caller-supplied audience definitions, and keeps a durable record of
//! which audiences the visitor has matched. Everything runs locally: page
//! history and matches live in a key-value [`storage::Storage`] owned by the
//! process.
//!
//! | Query | Score | Matches when |
//! |-------|-------|--------------|
//! | **Cosine similarity** | `a·b / (‖a‖‖b‖)`, 0 for zero vectors | score ≥ threshold |
//! | **Logistic regression** | `σ(w·x + bias)` | score ≥ threshold |
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, migrations, and health checks
//! - [`storage`] — Key-value persistence (in-memory and SQLite backends)
//! - [`audience`] — Audience types, query scoring, and definition evaluation
//! - [`store`] — Page-view history and matched-audience records
//! - [`run`] — The [`run::Edgekit`] entry point that processes one page

pub mod audience;
pub mod clock;
pub mod config;
pub mod consent;
pub mod db;
pub mod run;
pub mod storage;
pub mod store;

pub use run::{Edgekit, RunConfig, RunOutcome};
