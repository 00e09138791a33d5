//! Video-title heuristics for turning search results into song identities.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref COMPILATION_PATTERN: Regex = Regex::new(
        r"(?i)\b(full album|playlist|mix|megamix|compilation|best of|greatest hits|non ?stop|top \d+|\d+\s*hours?)\b"
    )
    .unwrap();

    static ref DERIVATIVE_PATTERN: Regex = Regex::new(
        r"(?i)\b(karaoke|instrumental|cover|nightcore|8d audio|slowed|sped up|reaction|tutorial|lesson)\b"
    )
    .unwrap();

    static ref DECORATION_PATTERN: Regex = Regex::new(
        r"(?i)\s*[\(\[][^\)\]]*(official|video|audio|lyrics?|visuali[sz]er|\bhd\b|\b4k\b|\bmv\b|m/v)[^\)\]]*[\)\]]"
    )
    .unwrap();
}

/// Long-form uploads that are not a single song.
pub fn is_compilation(title: &str) -> bool {
    COMPILATION_PATTERN.is_match(title)
}

/// Covers, karaoke and similar re-performances.
pub fn is_derivative(title: &str) -> bool {
    DERIVATIVE_PATTERN.is_match(title)
}

/// Auto-generated "Artist - Topic" channels and VEVO channels carry the
/// original recording.
pub fn is_primary_channel(channel: &str) -> bool {
    let channel = channel.trim();
    channel.ends_with(" - Topic") || channel.to_lowercase().contains("vevo")
}

/// Artist name behind a channel title: "Adele - Topic" and "AdeleVEVO" both
/// become "Adele".
pub fn channel_artist(channel: &str) -> String {
    let channel = channel.trim();
    let channel = channel.strip_suffix(" - Topic").unwrap_or(channel);
    let channel = channel
        .strip_suffix("VEVO")
        .or_else(|| channel.strip_suffix("Vevo"))
        .unwrap_or(channel);
    channel.trim().to_string()
}

/// Drop "(Official Video)", "[Lyrics]" and similar decorations.
pub fn clean_video_title(title: &str) -> String {
    let cleaned = DECORATION_PATTERN.replace_all(title, "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split "Artist - Title" on the first dash separator.
pub fn split_artist_title(title: &str) -> Option<(String, String)> {
    for separator in [" - ", " – ", " — "] {
        if let Some((artist, song)) = title.split_once(separator) {
            let artist = artist.trim();
            let song = song.trim();
            if !artist.is_empty() && !song.is_empty() {
                return Some((artist.to_string(), song.to_string()));
            }
        }
    }
    None
}

/// Decode the handful of HTML entities the search API leaves in titles.
pub fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}
