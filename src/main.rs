//! # News Monitor
//!
//! Command-line entry point. Loads the configuration, opens the database and
//! dispatches to one of the subcommands:
//!
//! - `run`: one monitoring cycle
//! - `watch`: a cycle every `watch.interval_secs`, plus on demand when the
//!   trigger file appears
//! - `export`: rewrite the snapshot only
//! - `status`: print database counters
//! - `seed`: insert the configured sources and keywords
//!
//! ## Usage
//!
//! ```sh
//! news_monitor --config monitor.yaml watch
//! ```

use clap::Parser;
use news_monitor::cli::{Cli, Command};
use news_monitor::config::MonitorConfig;
use news_monitor::outputs::CsvExporter;
use news_monitor::scrapers::{ExtractorRegistry, PageFetcher};
use news_monitor::store::Store;
use news_monitor::watch::watch;
use news_monitor::Monitor;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = args.resolve_config()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        database_url = %config.database_url,
        export_path = %config.export_path,
        concurrency = config.concurrency,
        "news_monitor starting up"
    );

    let store = Store::open(&config.database_url).await?;

    match args.command {
        Command::Seed => {
            let report = store.seed(&config.seed).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Status => {
            let status = store.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Export => {
            let rows = build_monitor(&config, store)?.export().await?;
            info!(rows, path = %config.export_path, "Snapshot written");
        }
        Command::Run { json } => {
            let report = build_monitor(&config, store)?.run_cycle().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "targets={} succeeded={} failed={} skipped={} inserted={} \
                     duplicates={} exported={} elapsed_ms={}",
                    report.targets,
                    report.succeeded,
                    report.failed,
                    report.skipped,
                    report.inserted,
                    report.duplicates,
                    report.exported,
                    report.elapsed_ms
                );
            }
        }
        Command::Watch => {
            let monitor = build_monitor(&config, store)?;
            watch(&monitor, &config.watch, interrupted()).await;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

fn build_monitor(config: &MonitorConfig, store: Store) -> news_monitor::Result<Monitor> {
    let fetcher = PageFetcher::new(&config.fetch)?;
    let registry = ExtractorRegistry::builtin();
    info!(media = ?registry.media_names(), "Extractors registered");
    let sink = Arc::new(CsvExporter::new(&config.export_path));
    Ok(Monitor::new(store, registry, fetcher, sink).with_concurrency(config.concurrency))
}

/// Resolves on Ctrl-C. If the handler cannot be installed the watch loop
/// keeps running and has to be stopped from outside.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
