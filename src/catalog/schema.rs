//! SQLite schema definitions for the song catalog database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

/// Songs table. `title_key`/`artist_key` hold the normalized identity and carry
/// the uniqueness constraint used by insert-if-absent.
const CATALOG_ENTRIES_TABLE: Table = Table {
    name: "catalog_entries",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("id", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("title_key", &SqlType::Text, non_null = true),
        sqlite_column!("artist_key", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("mood", &SqlType::Text, non_null = true), // JSON array
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("energy", &SqlType::Real),
        sqlite_column!("external_media_id", &SqlType::Text),
        sqlite_column!("cover_url", &SqlType::Text),
        sqlite_column!("embedding", &SqlType::Blob), // little-endian f32
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("idx_catalog_entries_title_key", "title_key"),
        ("idx_catalog_entries_artist_key", "artist_key"),
    ],
    unique_constraints: &[&["id"], &["title_key", "artist_key"]],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[CATALOG_ENTRIES_TABLE],
    migration: None,
}];
