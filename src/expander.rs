//! Target expansion: one monitored source in, one or more fetch targets out.
//!
//! National portals publish one sub-page per federative unit. A national
//! source with no region fans out into one target per unit; every other
//! source maps to exactly one target, with its region inferred from the URL
//! when the first path segment is a two letter code.

use crate::models::{FetchTarget, MonitoredSource};
use itertools::Itertools;
use tracing::debug;
use url::Url;

/// The 27 Brazilian federative units.
pub const REGION_CODES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// Media that publish one sub-page per region.
pub const NATIONAL_MEDIA: [&str; 3] = ["G1", "CNN Brasil", "R7"];

pub fn is_national(media: &str) -> bool {
    NATIONAL_MEDIA.contains(&media)
}

/// Expand a monitored source into concrete fetch targets.
pub fn expand(source: &MonitoredSource) -> Vec<FetchTarget> {
    let target = |region: Option<String>| FetchTarget {
        media: source.media.clone(),
        url: source.url.clone(),
        region,
        locality: source.locality.clone(),
    };

    let region = source
        .region
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_uppercase);

    let targets: Vec<FetchTarget> = if is_national(&source.media) {
        match region {
            Some(region) => vec![target(Some(region))],
            None => REGION_CODES
                .iter()
                .map(|code| target(Some(code.to_string())))
                .unique()
                .collect(),
        }
    } else {
        let region = region.or_else(|| infer_region_from_url(&source.url));
        vec![target(region)]
    };

    debug!(
        media = %source.media,
        url = %source.url,
        targets = targets.len(),
        "Expanded monitored source"
    );
    targets
}

/// Infer a region from the first path segment when it is exactly two letters.
///
/// `https://g1.globo.com/sp/campinas` -> `Some("SP")`.
pub fn infer_region_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let first = parsed.path().trim_matches('/').split('/').next()?;
    if first.chars().count() == 2 && first.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(first.to_uppercase())
    } else {
        None
    }
}

/// Guess the media name from a portal host, used when seeding sources.
pub fn infer_media_from_url(url: &str) -> Option<&'static str> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    if host.contains("g1.globo.com") {
        Some("G1")
    } else if host.contains("cnnbrasil.com.br") {
        Some("CNN Brasil")
    } else if host.contains("noticias.r7.com") {
        Some("R7")
    } else {
        None
    }
}
