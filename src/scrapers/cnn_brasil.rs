//! CNN Brasil listing extractor.
//!
//! Regional pages live at `https://www.cnnbrasil.com.br/<uf>/`. The markup has
//! no stable story container, so every anchor pointing back into the CNN
//! domain is a candidate; short anchor texts are menu and footer entries and
//! are dropped.

use crate::models::NewsCandidate;
use crate::scrapers::page::{COMMON_OVERLAYS, Listing, dismiss_overlays, element_text};
use crate::scrapers::{PageExtractor, PageFetcher, regional_url};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::instrument;

pub const NAME: &str = "CNN Brasil";
pub const BASE_URL: &str = "https://www.cnnbrasil.com.br/";

/// Headlines use `h2.font-bold`.
const READY_SELECTOR: &str = "h2.font-bold";
const MIN_TITLE_CHARS: usize = 20;

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href^='https://www.cnnbrasil.com.br/']").unwrap());

#[derive(Debug, Clone)]
pub struct CnnBrasilExtractor {
    fetcher: PageFetcher,
}

impl CnnBrasilExtractor {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    pub fn page_url(url: &str, region: Option<&str>) -> String {
        match region {
            Some(region) => regional_url(url, BASE_URL, &format!("{}/", region.to_lowercase())),
            None => url.to_string(),
        }
    }
}

#[async_trait]
impl PageExtractor for CnnBrasilExtractor {
    fn media(&self) -> &str {
        NAME
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str, region: Option<&str>, limit: usize) -> Vec<NewsCandidate> {
        let page_url = Self::page_url(url, region);
        self.fetcher
            .fetch_listing(NAME, &page_url, region, READY_SELECTOR, |html| {
                parse_listing(html, region, limit, Utc::now())
            })
            .await
    }
}

/// Extract candidates from a CNN Brasil page. The listing carries no
/// timestamps, so `published_at` is the fetch time.
pub fn parse_listing(
    html: &str,
    region: Option<&str>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<NewsCandidate> {
    let mut document = Html::parse_document(html);
    dismiss_overlays(&mut document, COMMON_OVERLAYS);

    let mut listing = Listing::new(limit);
    for anchor in document.root_element().select(&ANCHOR) {
        if listing.is_full() {
            break;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let title = element_text(&anchor);
        if title.chars().count() < MIN_TITLE_CHARS {
            continue;
        }
        listing.push(
            NewsCandidate::new(title, href, NAME)
                .with_region(region.map(str::to_uppercase))
                .with_published_at(now),
        );
    }
    listing.into_items()
}
