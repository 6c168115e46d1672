//! Delimited snapshot of every stored article.
//!
//! The snapshot is what the dashboard reads, so it is always replaced whole:
//! rows are written to `<path>.tmp` and renamed over `<path>`, and a reader
//! sees either the previous snapshot or the new one.
//!
//! # Format
//!
//! ```text
//! \u{feff}id;published_at;title;url;source;region;locality;category
//! 42;2025-12-09T12:43:00;Enchente atinge bairros de SP;https://g1.globo.com/sp/...;G1;SP;;
//! ```
//!
//! - `;` delimiter, UTF-8 with a byte order mark so spreadsheets pick the
//!   right encoding
//! - `published_at` as `YYYY-MM-DDTHH:MM:SS` (UTC), blank when unknown
//! - newest publication first, undated rows last, ties by descending id

use crate::error::{MonitorError, Result};
use crate::models::Article;
use crate::outputs::ExportSink;
use crate::store::Store;
use crate::utils::ensure_writable_dir;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

const BOM: &str = "\u{feff}";
const DELIMITER: char = ';';
const HEADER: [&str; 8] = [
    "id",
    "published_at",
    "title",
    "url",
    "source",
    "region",
    "locality",
    "category",
];

#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn export_err(&self, source: std::io::Error) -> MonitorError {
        MonitorError::Export {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl ExportSink for CsvExporter {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    async fn export(&self, store: &Store) -> Result<usize> {
        let articles = store.articles_for_export().await?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_writable_dir(parent).await?;
        }

        let body = render(&articles);
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, body).await.map_err(|e| self.export_err(e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.export_err(e))?;

        info!(rows = articles.len(), "Wrote snapshot");
        Ok(articles.len())
    }
}

/// Render the full snapshot, BOM and header included.
pub fn render(articles: &[Article]) -> String {
    let mut out = String::from(BOM);
    push_row(&mut out, HEADER.iter().map(|h| h.to_string()));
    for article in articles {
        push_row(
            &mut out,
            [
                article.id.to_string(),
                article
                    .published_at
                    .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
                    .unwrap_or_default(),
                article.title.trim().to_string(),
                article.url.clone(),
                article.source.clone(),
                article.region.clone().unwrap_or_default(),
                article.locality.clone().unwrap_or_default(),
                article.category.clone().unwrap_or_default(),
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(&escape(&field));
    }
    out.push_str("\r\n");
}

/// Quote a field when it contains the delimiter, a quote or a line break.
fn escape(field: &str) -> String {
    if field.contains([DELIMITER, '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
