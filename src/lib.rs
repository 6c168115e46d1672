//! # News Monitor
//!
//! Periodically visits a configured set of Brazilian news portals, extracts
//! headline listings, keeps the ones that mention a term of interest and
//! stores each article URL exactly once. After every cycle a flat snapshot of
//! all stored articles is written for the dashboard.
//!
//! ## Architecture
//!
//! ```text
//! Monitor -> expander -> (per target, concurrently) PageExtractor -> filter -> Store
//!                                                                              |
//!                                                           ExportSink <-------+
//! ```
//!
//! - [`monitor`]: the cycle state machine and bounded-concurrency dispatch
//! - [`expander`]: monitored source to fetch targets (regional fan-out)
//! - [`scrapers`]: extractor contract, registry, shared fetcher, portal adapters
//! - [`filter`]: keyword relevance filter
//! - [`store`]: SQLite persistence with URL-level deduplication
//! - [`outputs`]: snapshot export
//! - [`watch`]: scheduled and on-demand cycles until shutdown

pub mod cli;
pub mod config;
pub mod error;
pub mod expander;
pub mod filter;
pub mod models;
pub mod monitor;
pub mod outputs;
pub mod scrapers;
pub mod store;
pub mod utils;
pub mod watch;

pub use error::{MonitorError, Result};
pub use monitor::{CycleReport, Monitor};
