//! Keyword relevance filter.
//!
//! Matching is a plain case-insensitive substring test over title and
//! summary. Short keywords can therefore match inside longer words
//! (`"sp"` matches `"espaço"`); that is the intended behavior.

use crate::models::NewsCandidate;

/// Keep the candidates that mention at least one keyword.
///
/// With no keywords every candidate is kept: no configured interest means
/// "collect everything".
pub fn filter_by_keywords(
    candidates: Vec<NewsCandidate>,
    keywords: &[String],
) -> Vec<NewsCandidate> {
    if keywords.is_empty() {
        return candidates;
    }

    let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    candidates
        .into_iter()
        .filter(|candidate| {
            let haystack = candidate.haystack();
            lowered.iter().any(|kw| haystack.contains(kw.as_str()))
        })
        .collect()
}
