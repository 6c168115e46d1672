//! Monitor configuration loaded from an optional YAML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working setup that stores articles in `data/news.db` and writes the
//! dashboard snapshot to `dashboard/data/news_latest.csv`.
//!
//! ```yaml
//! database_url: sqlite://data/news.db?mode=rwc
//! export_path: dashboard/data/news_latest.csv
//! concurrency: 6
//! fetch:
//!   navigation_timeout_secs: 20
//!   content_ready_timeout_secs: 20
//!   limit: 100
//! watch:
//!   interval_secs: 1800
//!   trigger_file: logs/trigger_monitor.flag
//! seed:
//!   sources:
//!     - url: https://g1.globo.com/
//!     - url: https://jornal.example.com.br/pr/curitiba
//!       media: Jornal Local
//!       locality: Curitiba
//!   keywords: [enchente, deslizamento]
//! ```

use crate::error::{MonitorError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/news.db?mode=rwc";
pub const DEFAULT_EXPORT_PATH: &str = "dashboard/data/news_latest.csv";
pub const DEFAULT_CONCURRENCY: usize = 6;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub database_url: String,
    pub export_path: String,
    /// Number of targets processed simultaneously.
    pub concurrency: usize,
    pub fetch: FetchSettings,
    pub watch: WatchSettings,
    pub seed: SeedConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            export_path: DEFAULT_EXPORT_PATH.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            fetch: FetchSettings::default(),
            watch: WatchSettings::default(),
            seed: SeedConfig::default(),
        }
    }
}

/// Timeouts and limits applied by every extractor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub navigation_timeout_secs: u64,
    pub content_ready_timeout_secs: u64,
    pub ready_poll_interval_ms: u64,
    pub user_agent: String,
    /// Maximum candidates collected per target.
    pub limit: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: 20,
            content_ready_timeout_secs: 20,
            ready_poll_interval_ms: 5000,
            user_agent: format!("news_monitor/{}", env!("CARGO_PKG_VERSION")),
            limit: 100,
        }
    }
}

impl FetchSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn content_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.content_ready_timeout_secs)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    pub interval_secs: u64,
    /// Flag file that requests an immediate cycle when it appears.
    pub trigger_file: Option<String>,
    pub trigger_poll_secs: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30 * 60,
            trigger_file: None,
            trigger_poll_secs: 5,
        }
    }
}

/// Initial sources and keywords inserted by the `seed` command.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub sources: Vec<SeedSource>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSource {
    pub url: String,
    /// Inferred from the host when omitted.
    pub media: Option<String>,
    pub region: Option<String>,
    pub locality: Option<String>,
}

impl MonitorConfig {
    /// Load a config file, or the defaults when `path` is `None`.
    ///
    /// The result is not validated here: command-line overrides still have
    /// to be applied, so callers run [`MonitorConfig::validate`] afterwards.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(Path::new(path))
                    .map_err(|e| MonitorError::Config(format!("reading {path}: {e}")))?;
                let config = Self::from_yaml(&raw)?;
                info!(path, "Loaded configuration");
                config
            }
            None => {
                info!("No config file given; using defaults");
                Self::default()
            }
        };
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| MonitorError::Config(format!("parsing YAML: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(MonitorError::Config("concurrency must be at least 1".into()));
        }
        if self.fetch.limit == 0 {
            return Err(MonitorError::Config("fetch.limit must be at least 1".into()));
        }
        if self.watch.interval_secs == 0 {
            return Err(MonitorError::Config(
                "watch.interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
