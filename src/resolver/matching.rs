//! Title and artist matching heuristics used to accept search hits.

use unicode_segmentation::UnicodeSegmentation;

/// Lowercase with whitespace collapsed.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lowercase Unicode words with at least `min_len` characters.
pub fn significant_words(s: &str, min_len: usize) -> Vec<String> {
    s.unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() >= min_len)
        .collect()
}

/// Word-overlap check of a requested title against a hit title.
///
/// At least `ceil(n * ratio)` of the query's `n` significant words must occur
/// in the hit title. A query without significant words ("U2", "Up") must be
/// contained in the hit title as a whole.
pub fn title_overlap_matches(query: &str, hit_title: &str, ratio: f64, min_len: usize) -> bool {
    let hit = normalize(hit_title);
    let words = significant_words(query, min_len);

    if words.is_empty() {
        let query = normalize(query);
        return !query.is_empty() && hit.contains(&query);
    }

    let required = ((words.len() as f64 * ratio).ceil() as usize).max(1);
    let matched = words.iter().filter(|w| hit.contains(w.as_str())).count();
    matched >= required
}

/// Containment in either direction, or at least one shared significant token.
pub fn artist_matches(requested: &str, candidate: &str, min_len: usize) -> bool {
    let requested = normalize(requested);
    let candidate = normalize(candidate);
    if requested.is_empty() || candidate.is_empty() {
        return false;
    }
    if requested.contains(&candidate) || candidate.contains(&requested) {
        return true;
    }

    let candidate_words = significant_words(&candidate, min_len);
    significant_words(&requested, min_len)
        .iter()
        .any(|w| candidate_words.contains(w))
}

fn strip_trailing_parenthetical(s: &str) -> &str {
    match s.rfind(['(', '[']) {
        Some(idx) if idx > 0 && (s.ends_with(')') || s.ends_with(']')) => s[..idx].trim_end(),
        _ => s,
    }
}

/// Looser title check for plain-text search hits. Accepts, in order:
/// equality, a word-boundary prefix ("Song" for "Song Remastered"), a
/// parenthetical variant ("Song" for "Song (Live)"), or containment when the
/// query covers at least `containment_ratio` of the hit title.
pub fn substring_title_matches(query: &str, hit_title: &str, containment_ratio: f64) -> bool {
    let query = normalize(query);
    let hit = normalize(hit_title);
    if query.is_empty() || hit.is_empty() {
        return false;
    }

    if query == hit {
        return true;
    }

    if let Some(rest) = hit.strip_prefix(query.as_str()) {
        if rest.starts_with(|c: char| !c.is_alphanumeric()) {
            return true;
        }
    }

    if strip_trailing_parenthetical(&hit) == query || strip_trailing_parenthetical(&query) == hit {
        return true;
    }

    if hit.contains(&query) {
        let ratio = query.chars().count() as f64 / hit.chars().count() as f64;
        return ratio >= containment_ratio;
    }

    false
}
