//! Verified alternatives for a rejected candidate.

use crate::catalog::{identity_key, CatalogEntry, CatalogStore};
use crate::config::ResolverSettings;
use crate::resolver::normalize;
use crate::vibe::{evaluate, VibeRuleSet};
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SuggestionFinder {
    catalog: Arc<dyn CatalogStore>,
    settings: ResolverSettings,
}

impl SuggestionFinder {
    pub fn new(catalog: Arc<dyn CatalogStore>, settings: ResolverSettings) -> Self {
        Self { catalog, settings }
    }

    /// Up to `max_alternatives` entries that each pass `rules`.
    ///
    /// Same-artist entries come first, in catalog order. Only when none pass
    /// is the mood pool consulted, shuffled. An empty result is returned
    /// rather than anything unverified.
    pub fn find_alternatives(
        &self,
        rejected: &CatalogEntry,
        rules: Option<&VibeRuleSet>,
    ) -> Vec<CatalogEntry> {
        let limit = self.settings.max_alternatives;
        if limit == 0 {
            return Vec::new();
        }

        let same_artist = self.same_artist_pool(rejected, rules, limit);
        if !same_artist.is_empty() {
            debug!(count = same_artist.len(), "Suggesting same-artist alternatives");
            return same_artist;
        }

        let mut mood_pool = self.mood_pool(rejected, rules);
        mood_pool.shuffle(&mut rand::rng());
        mood_pool.truncate(limit);
        debug!(count = mood_pool.len(), "Suggesting mood-pool alternatives");
        mood_pool
    }

    fn same_artist_pool(
        &self,
        rejected: &CatalogEntry,
        rules: Option<&VibeRuleSet>,
        limit: usize,
    ) -> Vec<CatalogEntry> {
        let entries = match self
            .catalog
            .find_by_artist(&rejected.artist, self.settings.artist_exploration_limit)
        {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, artist = %rejected.artist, "Same-artist lookup failed");
                return Vec::new();
            }
        };

        // the store matches artists by containment; "Queen" also finds
        // "Queens of the Stone Age"
        let artist_key = identity_key(&rejected.artist);
        entries
            .into_iter()
            .filter(|e| identity_key(&e.artist) == artist_key)
            .filter(|e| !is_same_song(e, rejected))
            .filter(|e| evaluate(e, rules).matches)
            .take(limit)
            .collect()
    }

    fn mood_pool(&self, rejected: &CatalogEntry, rules: Option<&VibeRuleSet>) -> Vec<CatalogEntry> {
        let moods = rules.map(|r| r.allowed_mood_keys()).unwrap_or_default();
        if moods.is_empty() {
            return Vec::new();
        }

        match self.catalog.find_by_moods(&moods, self.settings.mood_pool_limit) {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| !is_same_song(e, rejected))
                .filter(|e| evaluate(e, rules).matches)
                .collect(),
            Err(e) => {
                warn!(error = %e, "Mood pool lookup failed");
                Vec::new()
            }
        }
    }
}

fn is_same_song(a: &CatalogEntry, b: &CatalogEntry) -> bool {
    a.id == b.id
        || (normalize(&a.title) == normalize(&b.title)
            && normalize(&a.artist) == normalize(&b.artist))
}
