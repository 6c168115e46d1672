//! Error taxonomy for the monitoring engine.
//!
//! Every failure a cycle can run into maps to one [`MonitorError`] variant.
//! Most of them never leave the scope they happen in: fetch failures are
//! swallowed inside the extractors, duplicates inside the store, and per-target
//! failures at the orchestrator's task boundary. Only [`MonitorError::ConfigLoad`]
//! fails a whole cycle.

use thiserror::Error;

/// Errors raised by the monitor, the store and the extractors.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No extractor is registered for the media name.
    #[error("no extractor registered for media '{media}'")]
    ExtractorNotFound { media: String },

    /// Navigation did not finish within the configured timeout.
    #[error("timed out fetching {url}")]
    FetchTimeout { url: String },

    /// Any other transport level failure (DNS, TLS, HTTP status, body).
    #[error("transport error fetching {url}: {source}")]
    FetchTransport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// An article with the same URL is already stored.
    #[error("article already stored: {url}")]
    DuplicateArticle { url: String },

    /// Storage failure other than a uniqueness violation.
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// The snapshot could not be written.
    #[error("export failed for {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Active sources or keywords could not be read at cycle start.
    #[error("could not load monitoring config: {0}")]
    ConfigLoad(#[source] sqlx::Error),

    /// Invalid or unreadable configuration.
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl MonitorError {
    /// Classify a reqwest failure into timeout vs. transport.
    pub fn from_fetch(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MonitorError::FetchTimeout {
                url: url.to_string(),
            }
        } else {
            MonitorError::FetchTransport {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subject() {
        let e = MonitorError::ExtractorNotFound {
            media: "Folha".into(),
        };
        assert_eq!(e.to_string(), "no extractor registered for media 'Folha'");

        let e = MonitorError::DuplicateArticle {
            url: "https://g1.globo.com/sp/a".into(),
        };
        assert!(e.to_string().contains("https://g1.globo.com/sp/a"));
    }

    #[test]
    fn test_config_load_wraps_sqlx_error() {
        let e = MonitorError::ConfigLoad(sqlx::Error::PoolClosed);
        assert!(e.to_string().starts_with("could not load monitoring config"));
        assert!(std::error::Error::source(&e).is_some());
    }
}
