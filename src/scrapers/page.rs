//! HTML helpers shared by the extractors.
//!
//! Everything here is synchronous: `scraper::Html` is not `Send`, so a parsed
//! document must never be held across an `.await`.
//!
//! `Html::select` scans the whole node arena, detached subtrees included.
//! Queries that must not see removed overlays go through
//! `document.root_element().select(..)`, which only walks attached nodes.

use crate::models::NewsCandidate;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Overlays found on most portals: consent banners and modal dialogs.
pub const COMMON_OVERLAYS: &[&str] = &[
    "[role='dialog']",
    "[aria-modal='true']",
    "#onetrust-consent-sdk",
    "#cookie-banner",
];

/// Whether `html` contains an element matching `selector`.
///
/// An unparseable selector counts as present so the caller stops waiting.
pub fn has_marker(html: &str, selector: &str) -> bool {
    let Ok(selector) = Selector::parse(selector) else {
        warn!(selector, "Invalid ready selector; not waiting for it");
        return true;
    };
    let document = Html::parse_document(html);
    document.root_element().select(&selector).next().is_some()
}

/// Remove overlay subtrees from a parsed document.
///
/// Best effort: invalid selectors are skipped and nothing here can fail.
/// Returns the number of removed elements.
pub fn dismiss_overlays(document: &mut Html, selectors: &[&str]) -> usize {
    let mut removed = 0;
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            debug!(selector = raw, "Skipping unparseable overlay selector");
            continue;
        };
        let ids: Vec<_> = document
            .root_element()
            .select(&selector)
            .map(|el| el.id())
            .collect();
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
                removed += 1;
            }
        }
    }
    if removed > 0 {
        debug!(removed, "Dismissed overlays");
    }
    removed
}

/// Visible text of an element with whitespace collapsed.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().flat_map(|t| t.split_whitespace()).join(" ")
}

/// Collects candidates for one page: each URL once, at most `limit` items.
#[derive(Debug)]
pub struct Listing {
    seen: HashSet<String>,
    items: Vec<NewsCandidate>,
    limit: usize,
}

impl Listing {
    pub fn new(limit: usize) -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
            limit,
        }
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    /// Add a candidate unless its URL was already collected or the limit
    /// is reached. Returns whether it was added.
    pub fn push(&mut self, candidate: NewsCandidate) -> bool {
        if self.is_full() || !self.seen.insert(candidate.url.clone()) {
            return false;
        }
        self.items.push(candidate);
        true
    }

    pub fn into_items(self) -> Vec<NewsCandidate> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_marker() {
        let html = r#"<html><body><div class="feed-post-body">x</div></body></html>"#;
        assert!(has_marker(html, "div.feed-post-body"));
        assert!(!has_marker(html, "h2.font-bold"));
        assert!(has_marker(html, "div[[["));
    }

    #[test]
    fn test_dismiss_overlays_removes_dialogs_and_ignores_bad_selectors() {
        let mut doc = Html::parse_document(
            r#"<html><body>
                <div role="dialog">
                    <a href="https://x.com/privacy">Política de privacidade completa</a>
                </div>
                <a href="https://x.com/news">Notícia</a>
            </body></html>"#,
        );
        let removed = dismiss_overlays(&mut doc, &["[role='dialog']", "###", "#absent"]);
        assert_eq!(removed, 1);

        let anchors = Selector::parse("a").unwrap();
        let hrefs: Vec<_> = doc
            .root_element()
            .select(&anchors)
            .filter_map(|a| a.value().attr("href"))
            .collect();
        assert_eq!(hrefs, vec!["https://x.com/news"]);
    }

    #[test]
    fn test_nested_overlays_are_counted_once() {
        let mut doc = Html::parse_document(
            r#"<html><body>
                <div role="dialog" aria-modal="true"><p>aceite os cookies</p></div>
                <p>conteúdo</p>
            </body></html>"#,
        );
        assert_eq!(dismiss_overlays(&mut doc, COMMON_OVERLAYS), 1);
        assert!(!has_marker(&doc.html(), "[role='dialog']"));
    }

    #[test]
    fn test_element_text_collapses_whitespace() {
        let doc = Html::parse_fragment("<a>  Chuva \n forte <b>em</b>   SP </a>");
        let a = doc.select(&Selector::parse("a").unwrap()).next().unwrap();
        assert_eq!(element_text(&a), "Chuva forte em SP");
    }

    #[test]
    fn test_listing_dedups_and_stops_at_limit() {
        let mut listing = Listing::new(2);
        assert!(listing.push(NewsCandidate::new("a", "https://x.com/1", "X")));
        assert!(!listing.push(NewsCandidate::new("a again", "https://x.com/1", "X")));
        assert!(listing.push(NewsCandidate::new("b", "https://x.com/2", "X")));
        assert!(listing.is_full());
        assert!(!listing.push(NewsCandidate::new("c", "https://x.com/3", "X")));
        assert_eq!(listing.into_items().len(), 2);
    }
}
