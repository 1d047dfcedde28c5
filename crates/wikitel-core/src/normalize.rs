//! Case/accent-insensitive title normalization.
//!
//! Two titles name the same page iff their normalized forms are equal. The
//! accent table covers a fixed handful of Latin characters; this is an
//! accepted approximation, not full script-aware normalization.

const ACCENT_FROM: &str = "àáäâèéëêìíïîòóöôùúüûñç·/_,:;";
const ACCENT_TO: &str = "aaaaeeeeiiiioooouuuunc------";

/// Canonicalize a title or search string for comparison: trim, lowercase,
/// fold the accent table to ASCII, collapse whitespace runs to a single
/// hyphen, collapse hyphen runs to one. Pure and idempotent.
pub fn normalize_title(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();

    let mut folded = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        match ACCENT_FROM.chars().position(|candidate| candidate == ch) {
            Some(index) => {
                // ACCENT_TO is ASCII, so nth() by char index is safe.
                folded.push(ACCENT_TO.as_bytes()[index] as char);
            }
            None => folded.push(ch),
        }
    }

    let mut normalized = String::with_capacity(folded.len());
    let mut pending_hyphen = false;
    for ch in folded.chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
            continue;
        }
        if pending_hyphen && !normalized.is_empty() {
            normalized.push('-');
        }
        pending_hyphen = false;
        normalized.push(ch);
    }
    normalized
}
