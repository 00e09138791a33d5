use super::rules::{VibeCheckResult, VibeRuleSet};
use crate::catalog::CatalogEntry;

/// Check `entry` against `rules`. Checks run in a fixed order and the first
/// failure wins:
///
/// 1. blocked moods
/// 2. allowed moods (only when the list is non-empty)
/// 3. era range (only when the entry has a year)
/// 4. blocked artists (substring match on the entry's artist)
///
/// An absent rule set always matches. All comparisons are trimmed and
/// case-insensitive. This function does no I/O.
pub fn evaluate(entry: &CatalogEntry, rules: Option<&VibeRuleSet>) -> VibeCheckResult {
    let Some(rules) = rules else {
        return VibeCheckResult::pass("No vibe rules set");
    };

    let moods: Vec<String> = entry
        .mood
        .iter()
        .map(|m| m.trim().to_lowercase())
        .collect();

    let blocked = rules.blocked_mood_keys();
    if let Some(hit) = moods.iter().find(|m| blocked.contains(m)) {
        return VibeCheckResult::fail(format!("Mood \"{}\" is blocked for this party", hit));
    }

    let allowed = rules.allowed_mood_keys();
    if !allowed.is_empty() && !moods.iter().any(|m| allowed.contains(m)) {
        return VibeCheckResult::fail(format!(
            "Mood does not fit the vibe (wanted one of: {})",
            allowed.join(", ")
        ));
    }

    if let (Some(year), Some(range)) = (entry.year, rules.allowed_era_range) {
        if !range.contains(year) {
            let reason = match (range.min.filter(|&min| year < min), range.max) {
                (Some(min), _) => format!(
                    "Released in {}, before the allowed era starting {}",
                    year, min
                ),
                (None, Some(max)) => format!(
                    "Released in {}, after the allowed era ending {}",
                    year, max
                ),
                (None, None) => format!("Released in {}, outside the allowed era", year),
            };
            return VibeCheckResult::fail(reason);
        }
    }

    let artist = entry.artist.trim().to_lowercase();
    if let Some(blocked_artist) = rules
        .blocked_artist_keys()
        .into_iter()
        .find(|b| artist.contains(b.as_str()))
    {
        return VibeCheckResult::fail(format!("Artist \"{}\" is blocked", blocked_artist));
    }

    VibeCheckResult::pass("Fits the vibe")
}
