//! Context carry-over between turns: affirmations and pending proposals.

use super::models::{ChatRole, ChatTurn, PendingProposal};
use lazy_static::lazy_static;
use regex::Regex;

const AFFIRMATIONS: &[&str] = &[
    "yes",
    "yeah",
    "yea",
    "yep",
    "yup",
    "y",
    "ok",
    "okay",
    "k",
    "sure",
    "please",
    "yes please",
    "sure thing",
    "go for it",
    "go ahead",
    "add it",
    "do it",
    "play it",
    "queue it",
    "sounds good",
    "perfect",
    "lets go",
    "absolutely",
    "definitely",
];

// Short tokens that end in a period without ending the sentence.
const ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "jr", "sr", "st", "mt", "ft", "feat", "vs",
];

lazy_static! {
    // "Title" by Artist, with straight or curly quotes. The artist runs to the
    // next quote or line break; `artist_name` trims the sentence tail.
    static ref PROPOSAL_PATTERN: Regex =
        Regex::new(r#"["“]([^"”]+)["”]\s+by\s+([^"“”\n]+)"#).unwrap();
}

fn is_abbreviation(token: &str) -> bool {
    let bare: String = token.chars().filter(|c| c.is_alphanumeric()).collect();
    let bare = bare.to_lowercase();
    bare.chars().count() == 1 || ABBREVIATIONS.contains(&bare.as_str())
}

/// Cut the artist where the sentence ends. `.` and `!` end it only when
/// followed by whitespace (or nothing) and not after an initial or a title
/// like "Dr."; a comma ends it when the next word is lowercase, so
/// "Tyler, The Creator" stays whole.
fn artist_name(raw: &str) -> &str {
    let mut chars = raw.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        let ends = match c {
            '?' | ';' => true,
            ',' => raw[pos + 1..]
                .trim_start()
                .chars()
                .next()
                .map_or(true, char::is_lowercase),
            '.' | '!' => {
                next.map_or(true, char::is_whitespace)
                    && !raw[..pos]
                        .split_whitespace()
                        .last()
                        .is_some_and(is_abbreviation)
            }
            _ => false,
        };
        if ends {
            return raw[..pos].trim();
        }
    }
    raw.trim()
}

fn normalize_utterance(utterance: &str) -> String {
    utterance
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// True for short confirmations like "yes!", "Go for it" or "ok.".
pub fn is_affirmation(utterance: &str) -> bool {
    let normalized = normalize_utterance(utterance);
    !normalized.is_empty() && AFFIRMATIONS.contains(&normalized.as_str())
}

/// Find the song offered by the most recent turn, if that turn is from the
/// assistant and names a song as `"Title" by Artist`.
pub fn derive_pending_proposal(history: &[ChatTurn]) -> Option<PendingProposal> {
    let last = history.last()?;
    if last.role != ChatRole::Assistant {
        return None;
    }

    let captures = PROPOSAL_PATTERN.captures_iter(&last.content).last()?;
    let title = captures.get(1)?.as_str().trim();
    let artist = artist_name(captures.get(2)?.as_str());
    if title.is_empty() || artist.is_empty() {
        return None;
    }
    Some(PendingProposal::new(title, artist))
}
