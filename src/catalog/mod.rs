//! Song catalog: models, SQLite schema and storage backend.
//!
//! The catalog doubles as a shared write-through cache: discovery hits that
//! pass the vibe check are enriched and inserted here, so later lookups for
//! any party find them without going back to discovery.

mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{identity_key, normalize_moods, CatalogEntry, NewCatalogEntry};
pub use schema::CATALOG_VERSIONED_SCHEMAS;
pub use store::{cosine_similarity, SqliteCatalogStore};
#[cfg(any(test, feature = "mock"))]
pub use trait_def::MockCatalogStore;
pub use trait_def::CatalogStore;
