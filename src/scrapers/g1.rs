//! G1 (Globo) listing extractor.
//!
//! G1 publishes a feed page per federative unit at `https://g1.globo.com/<uf>`.
//! Each story is a `div.feed-post-body` card carrying the headline link, an
//! optional summary and a human readable timestamp ("Há 2 horas",
//! "09/12/2025 09h43").

use crate::models::NewsCandidate;
use crate::scrapers::page::{COMMON_OVERLAYS, Listing, dismiss_overlays, element_text};
use crate::scrapers::{PageExtractor, PageFetcher, regional_url};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::instrument;
use url::Url;

pub const NAME: &str = "G1";
pub const BASE_URL: &str = "https://g1.globo.com/";

const READY_SELECTOR: &str = "div.feed-post-body";

/// G1 feedback widget plus the generic consent dialogs.
const OVERLAYS: &[&str] = &["[id^='QSIFeedbackButton']", "#cookie-banner-lgpd"];

static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse("div.feed-post-body").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.feed-post-link").unwrap());
static SUMMARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.feed-post-body-resumo").unwrap());
static DATETIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.feed-post-datetime").unwrap());

static RE_HOURS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+hora").unwrap());
static RE_MINUTES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+minuto").unwrap());
static RE_ABSOLUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2})/(\d{2})/(\d{4})\s*(\d{2})?h?(\d{2})?").unwrap());

/// Brasília time, the zone G1 prints its timestamps in.
static BRASILIA: Lazy<FixedOffset> = Lazy::new(|| FixedOffset::west_opt(3 * 3600).unwrap());

#[derive(Debug, Clone)]
pub struct G1Extractor {
    fetcher: PageFetcher,
}

impl G1Extractor {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// `https://g1.globo.com/` + `SP` -> `https://g1.globo.com/sp`.
    pub fn page_url(url: &str, region: Option<&str>) -> String {
        match region {
            Some(region) => regional_url(url, BASE_URL, &region.to_lowercase()),
            None => url.to_string(),
        }
    }
}

#[async_trait]
impl PageExtractor for G1Extractor {
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
                parse_listing(html, &page_url, region, limit, Utc::now())
            })
            .await
    }
}

/// Extract candidates from a G1 feed page.
pub fn parse_listing(
    html: &str,
    page_url: &str,
    region: Option<&str>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<NewsCandidate> {
    let mut document = Html::parse_document(html);
    dismiss_overlays(&mut document, COMMON_OVERLAYS);
    dismiss_overlays(&mut document, OVERLAYS);
    let base = Url::parse(page_url).ok();

    let mut listing = Listing::new(limit);
    for card in document.root_element().select(&CARD) {
        if listing.is_full() {
            break;
        }
        let Some(link) = card.select(&LINK).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = match base.as_ref().and_then(|b| b.join(href).ok()) {
            Some(resolved) => resolved.to_string(),
            None => href.to_string(),
        };
        let title = element_text(&link);
        if title.is_empty() {
            continue;
        }

        let mut candidate = NewsCandidate::new(title, url, NAME)
            .with_region(region.map(str::to_uppercase))
            .with_published_at(
                card.select(&DATETIME)
                    .next()
                    .map(|el| parse_g1_datetime(&element_text(&el), now))
                    .unwrap_or(now),
            );
        if let Some(summary) = card.select(&SUMMARY).next().map(|el| element_text(&el)) {
            if !summary.is_empty() {
                candidate = candidate.with_summary(summary);
            }
        }
        listing.push(candidate);
    }
    listing.into_items()
}

/// Parse G1's timestamp text. Unrecognized text falls back to `now`.
///
/// - `"Há 3 horas"` / `"Há 15 minutos"`: relative to `now`
/// - `"09/12/2025 09h43"` / `"09/12/2025"`: Brasília local time
pub fn parse_g1_datetime(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return now;
    }

    if text.starts_with("há ") {
        let delta = capture_number(&RE_HOURS, &text)
            .and_then(Duration::try_hours)
            .or_else(|| capture_number(&RE_MINUTES, &text).and_then(Duration::try_minutes));
        return delta
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(now);
    }

    if let Some(caps) = RE_ABSOLUTE.captures(&text) {
        let num = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(0)
        };
        let (day, month) = (num(1), num(2));
        let year = caps
            .get(3)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .unwrap_or(0);
        let parsed = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(num(4), num(5), 0))
            .and_then(|naive| BRASILIA.from_local_datetime(&naive).single());
        if let Some(local) = parsed {
            return local.with_timezone(&Utc);
        }
    }

    now
}

fn capture_number(re: &Regex, text: &str) -> Option<i64> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}
