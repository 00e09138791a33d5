//! Data models for the song catalog.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A song row in the catalog.
///
/// Rows are append-only: once inserted they are never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Lowercase mood tags, e.g. "sad", "upbeat".
    #[serde(default)]
    pub mood: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Energy level in 0.0..=1.0, as reported by the classifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
}

impl CatalogEntry {
    /// Display label used in logs and CLI output.
    pub fn label(&self) -> String {
        format!("\"{}\" by {}", self.title, self.artist)
    }
}

/// A song about to be inserted. The id is assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCatalogEntry {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub mood: BTreeSet<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub energy: Option<f32>,
    #[serde(default)]
    pub external_media_id: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
}

impl NewCatalogEntry {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("Catalog entry title must not be empty");
        }
        if self.artist.trim().is_empty() {
            bail!("Catalog entry artist must not be empty");
        }
        Ok(())
    }

    /// Normalized identity of this entry, the key for insert-if-absent.
    pub fn identity(&self) -> (String, String) {
        (identity_key(&self.title), identity_key(&self.artist))
    }
}

impl From<&CatalogEntry> for NewCatalogEntry {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            album: entry.album.clone(),
            year: entry.year,
            mood: entry.mood.clone(),
            genre: entry.genre.clone(),
            energy: entry.energy,
            external_media_id: entry.external_media_id.clone(),
            cover_url: entry.cover_url.clone(),
            embedding: entry.embedding.clone(),
        }
    }
}

/// Lowercases and collapses whitespace, so "  The  Weeknd" and "the weeknd"
/// share an identity.
pub fn identity_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalizes a set of mood tags to trimmed lowercase, dropping blanks.
pub fn normalize_moods<I, S>(moods: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    moods
        .into_iter()
        .map(|m| m.as_ref().trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect()
}
