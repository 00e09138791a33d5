//! Shared constants for end-to-end tests
//!
//! The seeded catalog is described here. When test data changes, update
//! only this file.

/// (title, artist, year, moods, genre)
pub type SeedSong = (&'static str, &'static str, i32, &'static [&'static str], &'static str);

pub const SEED_SONGS: &[SeedSong] = &[
    ("Blinding Lights", "The Weeknd", 2019, &["upbeat", "nostalgic"], "synthpop"),
    ("Bohemian Rhapsody", "Queen", 1975, &["epic", "dramatic"], "rock"),
    ("Don't Stop Me Now", "Queen", 1978, &["upbeat", "happy"], "rock"),
    ("Rolling in the Deep", "Adele", 2010, &["angry", "powerful"], "soul"),
    ("Rumour Has It", "Adele", 2011, &["upbeat", "sassy"], "soul"),
    ("Levitating", "Dua Lipa", 2020, &["upbeat", "happy"], "pop"),
    ("Dancing Queen", "ABBA", 1976, &["upbeat", "happy"], "disco"),
];

pub const SEED_COUNT: usize = 7;

// ============================================================================
// Discovery fixture
// ============================================================================

pub const DISCOVERED_TITLE: &str = "Someone Like You";
pub const DISCOVERED_ARTIST: &str = "Adele";
pub const DISCOVERED_VIDEO_ID: &str = "hLQl3WQQoQ0";
pub const DISCOVERED_YEAR: i32 = 2011;

// ============================================================================
// Vibe rule sets
// ============================================================================

/// Only sad songs.
pub const SAD_ONLY_RULES: &str = r#"{"allowedMoods": ["sad"]}"#;

/// Upbeat or epic songs released in 2000 or later.
pub const MODERN_UPBEAT_RULES: &str =
    r#"{"allowedMoods": ["upbeat", "epic"], "allowedEraRange": {"min": 2000}}"#;

/// Anything released in 2000 or later.
pub const MODERN_ONLY_RULES: &str = r#"{"allowedEraRange": {"min": 2000}}"#;
