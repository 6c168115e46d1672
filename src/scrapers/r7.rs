//! R7 listing extractor.
//!
//! R7 names its regional sections after the state (`/sao-paulo`,
//! `/rio-grande-do-sul`), not the two letter code.

use crate::models::NewsCandidate;
use crate::scrapers::page::{COMMON_OVERLAYS, Listing, dismiss_overlays, element_text};
use crate::scrapers::{PageExtractor, PageFetcher, regional_url};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::instrument;

pub const NAME: &str = "R7";
pub const BASE_URL: &str = "https://noticias.r7.com/";

const READY_SELECTOR: &str = "[data-tb-title='true']";
const MIN_TITLE_CHARS: usize = 20;

static HEADLINE_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[data-tb-title='true'] a[href^='https://noticias.r7.com/']").unwrap()
});

const STATE_SLUGS: [(&str, &str); 27] = [
    ("AC", "acre"),
    ("AL", "alagoas"),
    ("AP", "amapa"),
    ("AM", "amazonas"),
    ("BA", "bahia"),
    ("CE", "ceara"),
    ("DF", "distrito-federal"),
    ("ES", "espirito-santo"),
    ("GO", "goias"),
    ("MA", "maranhao"),
    ("MT", "mato-grosso"),
    ("MS", "mato-grosso-do-sul"),
    ("MG", "minas-gerais"),
    ("PA", "para"),
    ("PB", "paraiba"),
    ("PR", "parana"),
    ("PE", "pernambuco"),
    ("PI", "piaui"),
    ("RJ", "rio-de-janeiro"),
    ("RN", "rio-grande-do-norte"),
    ("RS", "rio-grande-do-sul"),
    ("RO", "rondonia"),
    ("RR", "roraima"),
    ("SC", "santa-catarina"),
    ("SP", "sao-paulo"),
    ("SE", "sergipe"),
    ("TO", "tocantins"),
];

/// Section slug for a federative unit code, case-insensitive.
pub fn state_slug(code: &str) -> Option<&'static str> {
    STATE_SLUGS
        .iter()
        .find(|(uf, _)| uf.eq_ignore_ascii_case(code))
        .map(|(_, slug)| *slug)
}

#[derive(Debug, Clone)]
pub struct R7Extractor {
    fetcher: PageFetcher,
}

impl R7Extractor {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Unknown region codes leave the URL untouched.
    pub fn page_url(url: &str, region: Option<&str>) -> String {
        match region.and_then(state_slug) {
            Some(slug) => regional_url(url, BASE_URL, slug),
            None => url.to_string(),
        }
    }
}

#[async_trait]
impl PageExtractor for R7Extractor {
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

/// Extract candidates from an R7 section page. Titles come from the anchor's
/// `title` attribute when present, otherwise from its text.
pub fn parse_listing(
    html: &str,
    region: Option<&str>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<NewsCandidate> {
    let mut document = Html::parse_document(html);
    dismiss_overlays(&mut document, COMMON_OVERLAYS);

    let mut listing = Listing::new(limit);
    for anchor in document.root_element().select(&HEADLINE_LINK) {
        if listing.is_full() {
            break;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let title = anchor
            .value()
            .attr("title")
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| element_text(&anchor));
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
