//! CatalogStore trait definition.

use super::models::{CatalogEntry, NewCatalogEntry};
use anyhow::Result;

/// Trait for catalog storage backends.
///
/// Every lookup the resolver and the suggestion finder perform goes through
/// this trait, so any method may fail; callers treat an error as "no result".
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Lookups
    // =========================================================================

    /// Case-insensitive title equality where the stored artist contains
    /// `artist`.
    fn find_exact(&self, title: &str, artist: &str) -> Result<Option<CatalogEntry>>;

    /// Entries whose title contains `query`, case-insensitively.
    fn text_search(&self, query: &str, limit: usize) -> Result<Vec<CatalogEntry>>;

    /// Entries with an embedding, ranked by cosine similarity to `vector`,
    /// highest first.
    fn semantic_search(&self, vector: &[f32], limit: usize) -> Result<Vec<(CatalogEntry, f32)>>;

    /// Entries tagged with at least one of `moods`.
    fn find_by_moods(&self, moods: &[String], limit: usize) -> Result<Vec<CatalogEntry>>;

    /// Entries whose artist contains `artist`, case-insensitively.
    fn find_by_artist(&self, artist: &str, limit: usize) -> Result<Vec<CatalogEntry>>;

    /// Get an entry by ID.
    fn get(&self, id: &str) -> Result<Option<CatalogEntry>>;

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert an entry unless one with the same normalized (title, artist)
    /// already exists. Returns the new row, or `None` if it was already there.
    fn insert_if_absent(&self, entry: &NewCatalogEntry) -> Result<Option<CatalogEntry>>;

    // =========================================================================
    // Stats
    // =========================================================================

    /// Number of rows in the catalog.
    fn count(&self) -> Result<usize>;
}
