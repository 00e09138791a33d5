//! Test fixture creation for the catalog database

use super::constants::*;
use super::fakes::hashed_vector;
use anyhow::Result;
use std::sync::Arc;
use tempfile::TempDir;
use vibe_resolver::catalog::{CatalogStore, NewCatalogEntry, SqliteCatalogStore};
use vibe_resolver::embedding::embedding_text;

/// Creates a temporary catalog holding `SEED_SONGS`, each embedded with
/// `hashed_vector` over its embedding text.
/// Returns (temp_dir, store); the directory must outlive the store.
pub fn create_test_catalog() -> Result<(TempDir, Arc<SqliteCatalogStore>)> {
    let dir = TempDir::new()?;
    let store = SqliteCatalogStore::new(dir.path().join("catalog.db"))?;

    for (title, artist, year, moods, genre) in SEED_SONGS {
        let mut entry = NewCatalogEntry {
            title: title.to_string(),
            artist: artist.to_string(),
            year: Some(*year),
            mood: moods.iter().map(|m| m.to_string()).collect(),
            genre: Some(genre.to_string()),
            ..Default::default()
        };
        let text = embedding_text(&entry.title, &entry.artist, &entry.mood, entry.genre.as_deref());
        entry.embedding = Some(hashed_vector(&text));
        store.insert_if_absent(&entry)?;
    }

    Ok((dir, Arc::new(store)))
}
