//! SQLite-backed catalog store implementation.

use super::models::{identity_key, normalize_moods, CatalogEntry, NewCatalogEntry};
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const ENTRY_COLUMNS: &str = "id, title, artist, album, year, mood, genre, energy,
     external_media_id, cover_url, embedding";

/// SQLite-backed catalog store.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_conn: Arc<Mutex<Connection>>,
    write_conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    /// Open (or create) the catalog database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database")?;

        migrate_if_needed(&mut write_conn, CATALOG_VERSIONED_SCHEMAS)?;

        write_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on catalog write connection")?;

        let read_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database for reading")?;

        let count: usize =
            read_conn.query_row("SELECT COUNT(*) FROM catalog_entries", [], |r| r.get(0))?;
        info!("Catalog store ready: {} entries", count);

        Ok(Self {
            read_conn: Arc::new(Mutex::new(read_conn)),
            write_conn: Arc::new(Mutex::new(write_conn)),
        })
    }

    fn row_to_entry(row: &Row) -> rusqlite::Result<CatalogEntry> {
        let mood_json: String = row.get(5)?;
        let embedding: Option<Vec<u8>> = row.get(10)?;
        Ok(CatalogEntry {
            id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            album: row.get(3)?,
            year: row.get(4)?,
            mood: parse_moods(&mood_json),
            genre: row.get(6)?,
            energy: row.get::<_, Option<f64>>(7)?.map(|e| e as f32),
            external_media_id: row.get(8)?,
            cover_url: row.get(9)?,
            embedding: embedding.as_deref().map(blob_to_vector),
        })
    }

    fn query_entries<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<CatalogEntry>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(sql)?;
        let entries = stmt
            .query_map(params, Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

// Helper: mood set to JSON array
fn moods_to_json(moods: &BTreeSet<String>) -> String {
    serde_json::to_string(moods).unwrap_or_else(|_| "[]".to_string())
}

// Helper: JSON array to mood set, tolerating malformed rows
fn parse_moods(json: &str) -> BTreeSet<String> {
    serde_json::from_str(json).unwrap_or_else(|e| {
        warn!("Malformed mood array in catalog db: {}: {}", json, e);
        BTreeSet::new()
    })
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity, `None` when the vectors cannot be compared.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return None;
    }
    Some((dot / denom) as f32)
}

impl CatalogStore for SqliteCatalogStore {
    fn find_exact(&self, title: &str, artist: &str) -> Result<Option<CatalogEntry>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM catalog_entries
             WHERE title_key = ?1 AND instr(artist_key, ?2) > 0
             ORDER BY rowid LIMIT 1",
            ENTRY_COLUMNS
        ))?;
        let entry = stmt
            .query_row(
                params![identity_key(title), identity_key(artist)],
                Self::row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn text_search(&self, query: &str, limit: usize) -> Result<Vec<CatalogEntry>> {
        let key = identity_key(query);
        if key.is_empty() {
            return Ok(vec![]);
        }
        self.query_entries(
            &format!(
                "SELECT {} FROM catalog_entries
                 WHERE instr(title_key, ?1) > 0
                 ORDER BY length(title_key), rowid LIMIT ?2",
                ENTRY_COLUMNS
            ),
            params![key, limit as i64],
        )
    }

    fn semantic_search(&self, vector: &[f32], limit: usize) -> Result<Vec<(CatalogEntry, f32)>> {
        let candidates = self.query_entries(
            &format!(
                "SELECT {} FROM catalog_entries WHERE embedding IS NOT NULL",
                ENTRY_COLUMNS
            ),
            params![],
        )?;

        let mut scored: Vec<(CatalogEntry, f32)> = candidates
            .into_iter()
            .filter_map(|entry| {
                let score = cosine_similarity(vector, entry.embedding.as_deref()?)?;
                Some((entry, score))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    fn find_by_moods(&self, moods: &[String], limit: usize) -> Result<Vec<CatalogEntry>> {
        let moods: Vec<String> = moods
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        if moods.is_empty() {
            return Ok(vec![]);
        }
        let placeholders = (1..=moods.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM catalog_entries
             WHERE EXISTS (SELECT 1 FROM json_each(catalog_entries.mood) WHERE json_each.value IN ({}))
             ORDER BY rowid LIMIT {}",
            ENTRY_COLUMNS, placeholders, limit
        );
        self.query_entries(&sql, params_from_iter(moods.iter()))
    }

    fn find_by_artist(&self, artist: &str, limit: usize) -> Result<Vec<CatalogEntry>> {
        let key = identity_key(artist);
        if key.is_empty() {
            return Ok(vec![]);
        }
        self.query_entries(
            &format!(
                "SELECT {} FROM catalog_entries
                 WHERE instr(artist_key, ?1) > 0
                 ORDER BY rowid LIMIT ?2",
                ENTRY_COLUMNS
            ),
            params![key, limit as i64],
        )
    }

    fn get(&self, id: &str) -> Result<Option<CatalogEntry>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM catalog_entries WHERE id = ?1",
            ENTRY_COLUMNS
        ))?;
        Ok(stmt.query_row(params![id], Self::row_to_entry).optional()?)
    }

    fn insert_if_absent(&self, entry: &NewCatalogEntry) -> Result<Option<CatalogEntry>> {
        entry.validate()?;
        let (title_key, artist_key) = entry.identity();
        let mood = normalize_moods(&entry.mood);
        let id = uuid::Uuid::new_v4().to_string();

        let conn = self.write_conn.lock().unwrap();
        let inserted = conn
            .execute(
                "INSERT INTO catalog_entries
                 (id, title, artist, title_key, artist_key, album, year, mood, genre, energy,
                  external_media_id, cover_url, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(title_key, artist_key) DO NOTHING",
                params![
                    id,
                    entry.title.trim(),
                    entry.artist.trim(),
                    title_key,
                    artist_key,
                    entry.album,
                    entry.year,
                    moods_to_json(&mood),
                    entry.genre,
                    entry.energy.map(f64::from),
                    entry.external_media_id,
                    entry.cover_url,
                    entry.embedding.as_deref().map(vector_to_blob),
                ],
            )
            .with_context(|| format!("Failed to insert catalog entry {}", entry.title))?;

        if inserted == 0 {
            return Ok(None);
        }

        Ok(Some(CatalogEntry {
            id,
            title: entry.title.trim().to_string(),
            artist: entry.artist.trim().to_string(),
            album: entry.album.clone(),
            year: entry.year,
            mood,
            genre: entry.genre.clone(),
            energy: entry.energy,
            external_media_id: entry.external_media_id.clone(),
            cover_url: entry.cover_url.clone(),
            embedding: entry.embedding.clone(),
        }))
    }

    fn count(&self) -> Result<usize> {
        let conn = self.read_conn.lock().unwrap();
        Ok(conn.query_row("SELECT COUNT(*) FROM catalog_entries", [], |r| r.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteCatalogStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("catalog.db");
        let store = SqliteCatalogStore::new(&db_path).unwrap();
        (store, temp_dir)
    }

    fn make_entry(title: &str, artist: &str, year: Option<i32>, moods: &[&str]) -> NewCatalogEntry {
        NewCatalogEntry {
            title: title.to_string(),
            artist: artist.to_string(),
            year,
            mood: moods.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_get() {
        let (store, _tmp) = create_test_store();
        let mut new_entry = make_entry("Blinding Lights", "The Weeknd", Some(2019), &["upbeat"]);
        new_entry.embedding = Some(vec![0.5, -0.25, 1.0]);

        let inserted = store.insert_if_absent(&new_entry).unwrap().unwrap();
        let fetched = store.get(&inserted.id).unwrap().unwrap();

        assert_eq!(fetched, inserted);
        assert_eq!(fetched.embedding, Some(vec![0.5, -0.25, 1.0]));
        assert!(fetched.mood.contains("upbeat"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_insert_if_absent_keeps_existing_row() {
        let (store, _tmp) = create_test_store();
        let first = make_entry("Hello", "Adele", Some(2015), &["sad"]);
        let inserted = store.insert_if_absent(&first).unwrap().unwrap();

        let conflicting = make_entry("  hello ", "ADELE", Some(1999), &["happy"]);
        assert!(store.insert_if_absent(&conflicting).unwrap().is_none());

        assert_eq!(store.count().unwrap(), 1);
        let kept = store.get(&inserted.id).unwrap().unwrap();
        assert_eq!(kept.year, Some(2015));
        assert!(kept.mood.contains("sad"));
    }

    #[test]
    fn test_insert_rejects_blank_title() {
        let (store, _tmp) = create_test_store();
        assert!(store
            .insert_if_absent(&make_entry("", "Adele", None, &[]))
            .is_err());
    }

    #[test]
    fn test_find_exact_is_case_insensitive_with_artist_containment() {
        let (store, _tmp) = create_test_store();
        store
            .insert_if_absent(&make_entry("Blinding Lights", "The Weeknd", None, &[]))
            .unwrap();

        let found = store.find_exact("blinding lights", "weeknd").unwrap();
        assert_eq!(found.unwrap().title, "Blinding Lights");

        assert!(store.find_exact("Blinding", "The Weeknd").unwrap().is_none());
        assert!(store.find_exact("Blinding Lights", "Adele").unwrap().is_none());
    }

    #[test]
    fn test_text_search_and_artist_lookup() {
        let (store, _tmp) = create_test_store();
        store
            .insert_if_absent(&make_entry("Hello", "Adele", None, &[]))
            .unwrap();
        store
            .insert_if_absent(&make_entry("Hello (Live at the Royal Albert Hall)", "Adele", None, &[]))
            .unwrap();
        store
            .insert_if_absent(&make_entry("Skyfall", "Adele", None, &[]))
            .unwrap();

        let hits = store.text_search("HELLO", 10).unwrap();
        assert_eq!(hits.len(), 2);
        // Shorter titles come first
        assert_eq!(hits[0].title, "Hello");

        assert_eq!(store.find_by_artist("adele", 10).unwrap().len(), 3);
        assert_eq!(store.find_by_artist("adele", 2).unwrap().len(), 2);
        assert!(store.text_search("  ", 10).unwrap().is_empty());
    }

    #[test]
    fn test_find_by_moods() {
        let (store, _tmp) = create_test_store();
        store
            .insert_if_absent(&make_entry("Hello", "Adele", None, &["sad", "emotional"]))
            .unwrap();
        store
            .insert_if_absent(&make_entry("Happy", "Pharrell Williams", None, &["happy"]))
            .unwrap();
        store
            .insert_if_absent(&make_entry("Untagged", "Nobody", None, &[]))
            .unwrap();

        let sad = store.find_by_moods(&["Sad".to_string()], 10).unwrap();
        assert_eq!(sad.len(), 1);
        assert_eq!(sad[0].title, "Hello");

        let either = store
            .find_by_moods(&["sad".to_string(), "happy".to_string()], 10)
            .unwrap();
        assert_eq!(either.len(), 2);

        assert!(store.find_by_moods(&[], 10).unwrap().is_empty());
    }

    #[test]
    fn test_semantic_search_orders_by_similarity() {
        let (store, _tmp) = create_test_store();
        let mut near = make_entry("Near", "A", None, &[]);
        near.embedding = Some(vec![1.0, 0.1]);
        let mut far = make_entry("Far", "B", None, &[]);
        far.embedding = Some(vec![-1.0, 0.0]);
        let no_vector = make_entry("None", "C", None, &[]);
        let mut wrong_dim = make_entry("Wrong", "D", None, &[]);
        wrong_dim.embedding = Some(vec![1.0, 0.0, 0.0]);

        for entry in [&far, &near, &no_vector, &wrong_dim] {
            store.insert_if_absent(entry).unwrap();
        }

        let hits = store.semantic_search(&[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.title, "Near");
        assert_eq!(hits[1].0.title, "Far");
        assert!(hits[0].1 > hits[1].1);

        assert_eq!(store.semantic_search(&[1.0, 0.0], 1).unwrap().len(), 1);
    }

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), Some(1.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).is_none());
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).is_none());
        assert!(cosine_similarity(&[], &[]).is_none());
    }

    #[test]
    fn test_reopen_existing_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("catalog.db");
        {
            let store = SqliteCatalogStore::new(&db_path).unwrap();
            store
                .insert_if_absent(&make_entry("Hello", "Adele", None, &[]))
                .unwrap();
        }
        let store = SqliteCatalogStore::new(&db_path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
