//! Data models for monitored sources, keywords, and collected articles.
//!
//! This module defines the core data structures used throughout the engine:
//! - [`MonitoredSource`] and [`Keyword`]: configuration rows owned by the
//!   management side, read once per cycle
//! - [`FetchTarget`]: one concrete page to fetch, produced by target expansion
//! - [`NewsCandidate`]: a headline as scraped, before filtering
//! - [`NewArticle`] / [`Article`]: what the store writes and reads back

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news portal (or one of its sections) that the monitor visits every cycle.
///
/// The URL is the identity. `region` is a two letter federative unit code
/// (`"SP"`, `"RJ"`, ...) and `locality` a free-form city name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredSource {
    pub id: i64,
    pub url: String,
    /// Media name, also the extractor registry key (`"G1"`, `"CNN Brasil"`, `"R7"`).
    pub media: String,
    pub region: Option<String>,
    pub locality: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A term of interest. Identity is the term, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: i64,
    pub term: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// One concrete page to fetch during a cycle.
///
/// Produced by [`crate::expander::expand`], consumed by exactly one worker and
/// then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FetchTarget {
    pub media: String,
    pub url: String,
    pub region: Option<String>,
    pub locality: Option<String>,
}

impl FetchTarget {
    /// Region for log fields, `"N/A"` when unset.
    pub fn region_label(&self) -> &str {
        self.region.as_deref().unwrap_or("N/A")
    }
}

/// A headline as returned by an extractor, before keyword filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsCandidate {
    pub title: String,
    pub url: String,
    /// Media name of the extractor that produced it.
    pub source: String,
    pub summary: Option<String>,
    pub region: Option<String>,
    pub locality: Option<String>,
    pub category: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewsCandidate {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            summary: None,
            region: None,
            locality: None,
            category: None,
            published_at: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Lowercased `title + " " + summary`, the text keywords are matched against.
    pub fn haystack(&self) -> String {
        format!(
            "{} {}",
            self.title,
            self.summary.as_deref().unwrap_or_default()
        )
        .to_lowercase()
    }
}

/// An article ready to be inserted. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub source: String,
    pub region: Option<String>,
    pub locality: Option<String>,
    pub category: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewArticle {
    /// Build an article from a candidate, falling back to the target's
    /// locality/region when the extractor did not set them.
    ///
    /// Blank defaults count as absent so an empty string is never stored.
    pub fn from_candidate(
        candidate: NewsCandidate,
        default_locality: Option<&str>,
        default_region: Option<&str>,
    ) -> Self {
        Self {
            title: candidate.title,
            url: candidate.url,
            summary: candidate.summary,
            source: candidate.source,
            region: non_blank(candidate.region).or_else(|| owned_non_blank(default_region)),
            locality: non_blank(candidate.locality)
                .or_else(|| owned_non_blank(default_locality)),
            category: candidate.category,
            published_at: candidate.published_at,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn owned_non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A persisted article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub source: String,
    pub region: Option<String>,
    pub locality: Option<String>,
    pub category: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haystack_joins_title_and_summary_lowercase() {
        let c = NewsCandidate::new("Enchente em SP", "https://g1.globo.com/sp/x", "G1")
            .with_summary("Chuva FORTE");
        assert_eq!(c.haystack(), "enchente em sp chuva forte");

        let c = NewsCandidate::new("Só título", "https://g1.globo.com/sp/y", "G1");
        assert_eq!(c.haystack(), "só título ");
    }

    #[test]
    fn test_new_article_uses_defaults_when_candidate_has_none() {
        let c = NewsCandidate::new("Title long enough", "https://r7.com/a", "R7");
        let a = NewArticle::from_candidate(c, Some("Campinas"), Some("SP"));
        assert_eq!(a.locality.as_deref(), Some("Campinas"));
        assert_eq!(a.region.as_deref(), Some("SP"));
    }

    #[test]
    fn test_new_article_prefers_candidate_values() {
        let c = NewsCandidate::new("Title", "https://r7.com/b", "R7")
            .with_region(Some("RJ".into()));
        let a = NewArticle::from_candidate(c, None, Some("SP"));
        assert_eq!(a.region.as_deref(), Some("RJ"));
        assert_eq!(a.locality, None);
    }

    #[test]
    fn test_new_article_ignores_blank_defaults() {
        let c = NewsCandidate::new("Title", "https://r7.com/c", "R7");
        let a = NewArticle::from_candidate(c, Some("  "), Some(""));
        assert_eq!(a.locality, None);
        assert_eq!(a.region, None);
    }

    #[test]
    fn test_region_label() {
        let t = FetchTarget {
            media: "G1".into(),
            url: "https://g1.globo.com/".into(),
            region: None,
            locality: None,
        };
        assert_eq!(t.region_label(), "N/A");
    }
}
