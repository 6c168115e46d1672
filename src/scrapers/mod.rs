//! News portal extractors.
//!
//! Every supported portal is an adapter implementing [`PageExtractor`]. The
//! monitor never calls an adapter directly: it resolves a factory from the
//! [`ExtractorRegistry`] by media name and builds the extractor with the shared
//! [`PageFetcher`].
//!
//! # Supported Sources
//!
//! | Media | Module | Regional page | Ready marker |
//! |-------|--------|---------------|--------------|
//! | G1 | [`g1`] | `/<uf>` | `div.feed-post-body` |
//! | CNN Brasil | [`cnn_brasil`] | `/<uf>/` | `h2.font-bold` |
//! | R7 | [`r7`] | `/<state-slug>` | `[data-tb-title='true']` |
//!
//! # Contract
//!
//! An extractor:
//! - bounds navigation by the configured timeout,
//! - strips known overlays (consent banners, feedback dialogs) before reading
//!   the page, without ever failing because of them,
//! - waits a bounded time for its ready marker,
//! - returns each URL at most once and never more than `limit` candidates,
//! - returns an empty list when the page cannot be fetched.
//!
//! The region hint only rewrites the URL when the caller passed the portal's
//! bare base URL; a URL that already points at a section is fetched as is.

pub mod cnn_brasil;
pub mod fetch;
pub mod g1;
pub mod page;
pub mod r7;
pub mod registry;

use crate::models::NewsCandidate;
use async_trait::async_trait;

pub use fetch::PageFetcher;
pub use registry::{ExtractorFactory, ExtractorRegistry};

/// Capability implemented once per news portal.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Media name, also the registry key.
    fn media(&self) -> &str;

    /// The portal's home page.
    fn base_url(&self) -> &str;

    /// Fetch a listing page and return up to `limit` candidates.
    ///
    /// Never fails: transport problems and timeouts yield an empty list.
    async fn fetch(&self, url: &str, region: Option<&str>, limit: usize) -> Vec<NewsCandidate>;

    /// Shortcut for the portal's home page.
    async fn fetch_latest(&self, limit: usize) -> Vec<NewsCandidate> {
        let base = self.base_url().to_string();
        self.fetch(&base, None, limit).await
    }
}

/// Point a bare base URL at a regional section.
///
/// `url` is returned unchanged unless it equals `base_url` (ignoring trailing
/// slashes), in which case `section` is appended to the base.
pub fn regional_url(url: &str, base_url: &str, section: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if url.trim_end_matches('/') == base {
        format!("{base}/{section}")
    } else {
        url.to_string()
    }
}
