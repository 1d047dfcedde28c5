//! Fallback title resolution after a failed render.
//!
//! Mistyped case or accents are the dominant failure mode for hand-typed
//! titles; one extra prefix-search call recovers most of them.

use tracing::debug;

use wikitel_api::SearchProvider;
use wikitel_core::{normalize_title, SEARCH_LIMIT};

/// Find the best real title matching `requested` up to case/accent
/// normalization. The search runs on the raw requested string; among hits
/// whose normalized title equals the normalized request, the lowest rank
/// index wins. Search failure or no normalized match resolves to `None`.
pub async fn resolve_title(
    search: &dyn SearchProvider,
    domain: &str,
    requested: &str,
) -> Option<String> {
    let target = normalize_title(requested);
    let hits = match search.prefix_search(domain, requested, SEARCH_LIMIT).await {
        Ok(hits) => hits,
        Err(error) => {
            debug!(domain, requested, %error, "resolution search failed");
            return None;
        }
    };
    hits.into_iter()
        .filter(|hit| normalize_title(&hit.title) == target)
        .min_by_key(|hit| hit.index)
        .map(|hit| hit.title)
}
