use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EdgekitConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub views: ViewsConfig,
    pub consent: ConsentConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Page-view retention. Views older than `retention_days` are pruned, and
/// when `max_page_views` is set only the newest views are kept.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewsConfig {
    pub retention_days: f64,
    pub max_page_views: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ConsentConfig {
    pub granted: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_edgekit_dir()
            .join("edgekit.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            retention_days: 30.0,
            max_page_views: None,
        }
    }
}

/// Returns `~/.edgekit/`, or `./.edgekit/` when no home directory is known.
pub fn default_edgekit_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".edgekit")
}

/// Returns the default config file path: `~/.edgekit/config.toml`
pub fn default_config_path() -> PathBuf {
    default_edgekit_dir().join("config.toml")
}

impl EdgekitConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EdgekitConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (EDGEKIT_DB, EDGEKIT_LOG_LEVEL, EDGEKIT_CONSENT).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("EDGEKIT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("EDGEKIT_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("EDGEKIT_CONSENT") {
            self.consent.granted = parse_flag(&val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Retention window for page views, in milliseconds.
    pub fn retention_ms(&self) -> i64 {
        days_to_ms(self.views.retention_days)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Convert a fractional day count to milliseconds, saturating at the `i64` range.
pub fn days_to_ms(days: f64) -> i64 {
    (days * 86_400_000.0).round() as i64
}

fn parse_flag(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
