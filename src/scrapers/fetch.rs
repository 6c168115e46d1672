//! Shared HTTP fetching for all extractors.

use crate::config::FetchSettings;
use crate::error::{MonitorError, Result};
use crate::models::NewsCandidate;
use crate::scrapers::page::has_marker;
use reqwest::Client;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// HTTP client plus the timeouts every extractor must honor.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    settings: FetchSettings,
}

impl PageFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.navigation_timeout())
            .build()
            .map_err(|e| MonitorError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    async fn get_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MonitorError::from_fetch(url, e))?;
        response
            .text()
            .await
            .map_err(|e| MonitorError::from_fetch(url, e))
    }

    /// Fetch `url` until `ready_selector` shows up or the content-ready
    /// timeout elapses.
    ///
    /// The first request must succeed. After that, a page without the marker
    /// is refetched every poll interval; when time runs out (or a refetch
    /// fails) the last page received is returned anyway.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_page(&self, url: &str, ready_selector: &str) -> Result<String> {
        let deadline = Instant::now() + self.settings.content_ready_timeout();
        let poll = self.settings.ready_poll_interval();

        let mut html = self.get_html(url).await?;
        loop {
            if has_marker(&html, ready_selector) {
                return Ok(html);
            }
            if Instant::now() + poll >= deadline {
                debug!(
                    %url,
                    ready_selector,
                    "Ready marker not found before timeout; using last page"
                );
                return Ok(html);
            }
            sleep(poll).await;
            match self.get_html(url).await {
                Ok(next) => html = next,
                Err(e) => {
                    debug!(%url, error = %e, "Refetch while waiting for ready marker failed");
                    return Ok(html);
                }
            }
        }
    }

    /// Fetch a listing page and hand its HTML to `parse`.
    ///
    /// Any fetch failure is logged at warning level and turns into an empty
    /// result so one broken portal never affects the others.
    pub async fn fetch_listing<F>(
        &self,
        media: &str,
        page_url: &str,
        region: Option<&str>,
        ready_selector: &str,
        parse: F,
    ) -> Vec<NewsCandidate>
    where
        F: FnOnce(&str) -> Vec<NewsCandidate> + Send,
    {
        let region_label = region.unwrap_or("N/A");
        info!(%media, %page_url, region = region_label, "Fetching listing");

        let html = match self.fetch_page(page_url, ready_selector).await {
            Ok(html) => html,
            Err(e) => {
                warn!(
                    %media,
                    %page_url,
                    region = region_label,
                    error = %e,
                    "No HTML returned; skipping target"
                );
                return Vec::new();
            }
        };

        let items = parse(&html);
        info!(%media, %page_url, count = items.len(), "Parsed listing");
        items
    }
}
