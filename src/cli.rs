//! Command-line interface definitions for News Monitor.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Global options can be provided via command-line flags or environment
//! variables and override the values from the YAML config file.

use crate::config::MonitorConfig;
use crate::error::Result;
use clap::{Parser, Subcommand};

/// Command-line arguments for the News Monitor application.
///
/// # Examples
///
/// ```sh
/// # One cycle with the default config
/// news_monitor run
///
/// # Keep running every 30 minutes, reading settings from a file
/// news_monitor --config monitor.yaml watch
///
/// # Insert the seed sources and keywords from the config file
/// news_monitor --config monitor.yaml seed
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true, env = "NEWS_MONITOR_CONFIG")]
    pub config: Option<String>,

    /// SQLite database URL (overrides `database_url`)
    #[arg(long, global = true, env = "NEWS_MONITOR_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Snapshot path (overrides `export_path`)
    #[arg(long, global = true, env = "NEWS_MONITOR_EXPORT_PATH")]
    pub export_path: Option<String>,

    /// Targets processed at once (overrides `concurrency`)
    #[arg(long, global = true, env = "NEWS_MONITOR_CONCURRENCY")]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run one monitoring cycle and exit
    Run {
        /// Print the cycle report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a cycle every interval, plus on demand when the trigger file appears
    Watch,
    /// Write the snapshot without fetching anything
    Export,
    /// Print database counters as JSON
    Status,
    /// Insert the seed sources and keywords from the config file
    Seed,
}

impl Cli {
    /// Fold the command-line overrides into a loaded config.
    pub fn apply_overrides(&self, config: &mut MonitorConfig) {
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }
        if let Some(path) = &self.export_path {
            config.export_path = path.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }

    /// Load the config file, fold in the overrides, then validate the result.
    pub fn resolve_config(&self) -> Result<MonitorConfig> {
        let mut config = MonitorConfig::load(self.config.as_deref())?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "news_monitor",
            "--config",
            "./monitor.yaml",
            "run",
            "--json",
        ]);

        assert_eq!(cli.config.as_deref(), Some("./monitor.yaml"));
        assert_eq!(cli.command, Command::Run { json: true });
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "news_monitor",
            "watch",
            "--database-url",
            "sqlite::memory:",
            "--concurrency",
            "2",
        ]);

        assert_eq!(cli.command, Command::Watch);
        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(cli.concurrency, Some(2));
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from([
            "news_monitor",
            "--export-path",
            "/tmp/news.csv",
            "--concurrency",
            "0",
            "export",
        ]);
        let mut config = MonitorConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.export_path, "/tmp/news.csv");
        assert_eq!(config.concurrency, 0);
        assert!(config.validate().is_err());
        assert_eq!(config.database_url, crate::config::DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["news_monitor"]).is_err());
    }

    #[test]
    fn test_override_fixes_invalid_file_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"concurrency: 0\n").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let cli = Cli::parse_from([
            "news_monitor",
            "--config",
            &path,
            "--concurrency",
            "4",
            "status",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.concurrency, 4);

        let cli = Cli::parse_from(["news_monitor", "--config", &path, "status"]);
        assert!(cli.resolve_config().is_err());
    }
}
