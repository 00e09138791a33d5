//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestPipeline;
//!
//! #[tokio::test]
//! async fn test_exact_match() {
//!     let harness = TestPipeline::spawn(&[(
//!         "play Levitating",
//!         r#"{"title": "Levitating", "artist": "Dua Lipa", "isRequest": true}"#,
//!     )]);
//!     let outcome = harness.say("play Levitating", None).await;
//! }
//! ```

#![allow(dead_code)]

mod constants;
mod fakes;
mod fixtures;
mod server;

// Public API - this is what tests import
pub use constants::*;
pub use fakes::{hashed_vector, FixedDiscovery, HashingEmbedder, ScriptedExtractor, TableClassifier};
pub use server::{FakeApiServer, RecordedRequest};

use fixtures::create_test_catalog;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vibe_resolver::catalog::{CatalogStore, SqliteCatalogStore};
use vibe_resolver::classify::Classification;
use vibe_resolver::config::ResolverSettings;
use vibe_resolver::discovery::DiscoveryHit;
use vibe_resolver::enrichment::CatalogEnrichment;
use vibe_resolver::interpreter::{RequestInterpreter, TurnInput};
use vibe_resolver::pipeline::{RequestPipeline, ResolutionOutcome};
use vibe_resolver::resolver::CandidateResolver;
use vibe_resolver::retry::RetryPolicy;
use vibe_resolver::vibe::VibeRuleSet;

/// A `RequestPipeline` over a seeded SQLite catalog and counting fakes.
pub struct TestPipeline {
    pub pipeline: Arc<RequestPipeline>,
    pub catalog: Arc<SqliteCatalogStore>,
    pub extractor: Arc<ScriptedExtractor>,
    pub embedder: Arc<HashingEmbedder>,
    pub discovery: Arc<FixedDiscovery>,
    pub classifier: Arc<TableClassifier>,

    // Keeps the database alive until drop
    _temp_dir: TempDir,
}

pub fn discovered_hit() -> DiscoveryHit {
    DiscoveryHit {
        title: DISCOVERED_TITLE.to_string(),
        artist: DISCOVERED_ARTIST.to_string(),
        external_media_id: DISCOVERED_VIDEO_ID.to_string(),
        cover_url: None,
        year: Some(DISCOVERED_YEAR),
    }
}

pub fn rules(json: &str) -> VibeRuleSet {
    VibeRuleSet::from_json(json).expect("Invalid rule set fixture")
}

impl TestPipeline {
    /// Seeded catalog, `script` for the extractor, discovery always
    /// returning `discovered_hit()`, and a classifier that knows it as sad.
    pub fn spawn(script: &[(&str, &str)]) -> Self {
        let (temp_dir, catalog) = create_test_catalog().expect("Failed to create test catalog");
        let extractor = Arc::new(ScriptedExtractor::new(script));
        let embedder = Arc::new(HashingEmbedder::new());
        let discovery = Arc::new(FixedDiscovery::new(Some(discovered_hit())));
        let classifier = Arc::new(TableClassifier::new(&[(
            DISCOVERED_TITLE,
            Classification::new(["sad", "emotional"], Some("pop"), Some(0.3)),
        )]));

        let settings = ResolverSettings::default();
        let retry = RetryPolicy::no_retry(Duration::from_secs(2));
        let store: Arc<dyn CatalogStore> = catalog.clone();

        let interpreter =
            RequestInterpreter::new(extractor.clone(), retry.clone(), settings.history_window);
        let resolver = CandidateResolver::new(store.clone(), settings.clone(), retry.clone())
            .with_embedder(embedder.clone())
            .with_discovery(discovery.clone(), classifier.clone());
        let enrichment = CatalogEnrichment::new(store.clone(), classifier.clone(), retry)
            .with_embedder(embedder.clone());

        let pipeline = RequestPipeline::new(interpreter, resolver, store, settings)
            .with_enrichment(enrichment);

        Self {
            pipeline: Arc::new(pipeline),
            catalog,
            extractor,
            embedder,
            discovery,
            classifier,
            _temp_dir: temp_dir,
        }
    }

    pub async fn say(&self, utterance: &str, rules: Option<&VibeRuleSet>) -> ResolutionOutcome {
        self.pipeline.resolve(TurnInput::new(utterance), rules).await
    }

    pub fn catalog_count(&self) -> usize {
        self.catalog.count().expect("Failed to count catalog")
    }
}
