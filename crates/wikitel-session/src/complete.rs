//! Tab completion: static commands merged with live prefix-search results.

use tracing::debug;

use wikitel_api::SearchProvider;
use wikitel_core::{static_commands, SEARCH_LIMIT};

/// Candidates for a partially typed line: static commands whose prefix
/// matches (byte-for-byte, case-sensitive), then live search hits in rank
/// order. A failed or empty search degrades silently to static matches,
/// and the result is never empty — an empty merge falls back to the full
/// command roster so the user always sees options.
pub async fn complete_input(
    search: &dyn SearchProvider,
    domain: &str,
    partial: &str,
) -> Vec<String> {
    let roster = static_commands();
    if partial.is_empty() {
        return roster;
    }

    let mut candidates: Vec<String> = roster
        .iter()
        .filter(|command| command.starts_with(partial))
        .cloned()
        .collect();

    match search.prefix_search(domain, partial, SEARCH_LIMIT).await {
        Ok(hits) => candidates.extend(hits.into_iter().map(|hit| hit.title)),
        Err(error) => {
            debug!(domain, partial, %error, "completion search failed, static only");
        }
    }

    if candidates.is_empty() {
        return roster;
    }
    candidates
}
