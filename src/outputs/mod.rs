//! Export sinks: flattened views of the stored articles for external readers.
//!
//! # Submodules
//!
//! - [`csv`]: `;`-delimited snapshot consumed by the dashboard

pub mod csv;

use crate::error::Result;
use crate::store::Store;
use async_trait::async_trait;

pub use csv::CsvExporter;

/// Consumes the persisted state after each cycle.
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Write a snapshot of `store`, returning the number of exported rows.
    async fn export(&self, store: &Store) -> Result<usize>;
}
