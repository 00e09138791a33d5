//! Write-through enrichment of the catalog from discovery hits.
//!
//! A discovery candidate that passed the vibe check is classified, embedded
//! and inserted with insert-if-absent semantics. Any failure leaves the
//! catalog untouched; the current outcome is never affected.

use crate::catalog::{CatalogEntry, CatalogStore, NewCatalogEntry};
use crate::classify::{Classification, TrackClassifier};
use crate::embedding::{embedding_text, EmbeddingProvider};
use crate::resolver::{Candidate, SourceKind};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentReport {
    Inserted(CatalogEntry),
    /// A row with the same normalized (title, artist) already exists. Carries
    /// that row unless looking it up failed.
    AlreadyPresent(Option<CatalogEntry>),
    Skipped(String),
}

impl EnrichmentReport {
    pub fn label(&self) -> &'static str {
        match self {
            EnrichmentReport::Inserted(_) => "inserted",
            EnrichmentReport::AlreadyPresent(_) => "already_present",
            EnrichmentReport::Skipped(_) => "skipped",
        }
    }
}

pub struct CatalogEnrichment {
    catalog: Arc<dyn CatalogStore>,
    classifier: Arc<dyn TrackClassifier>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    retry: RetryPolicy,
}

impl CatalogEnrichment {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        classifier: Arc<dyn TrackClassifier>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            catalog,
            classifier,
            embedder: None,
            retry,
        }
    }

    /// Without an embedder rows are stored without a vector; they stay
    /// reachable through exact and substring lookups.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Persist an accepted discovery candidate.
    pub async fn enrich(&self, candidate: &Candidate) -> EnrichmentReport {
        if candidate.source != SourceKind::Discovery {
            return self.finish(EnrichmentReport::Skipped(
                "candidate already comes from the catalog".to_string(),
            ));
        }

        let entry = &candidate.entry;
        let classification = match &candidate.classification {
            Some(c) => Some(c.clone()),
            None => self.classify(&entry.title, &entry.artist, entry.year).await,
        };
        let Some(classification) = classification else {
            return self.finish(EnrichmentReport::Skipped("classification failed".to_string()));
        };

        let mut new_entry = NewCatalogEntry::from(entry);
        new_entry.embedding = None;
        self.persist(new_entry, classification).await
    }

    /// Seed the catalog with an externally supplied entry through the same
    /// write path. Entries without moods are classified first.
    pub async fn seed(&self, entry: NewCatalogEntry) -> EnrichmentReport {
        if let Err(e) = entry.validate() {
            return self.finish(EnrichmentReport::Skipped(e.to_string()));
        }

        let classification = if entry.mood.is_empty() {
            match self.classify(&entry.title, &entry.artist, entry.year).await {
                Some(c) => c,
                None => {
                    return self
                        .finish(EnrichmentReport::Skipped("classification failed".to_string()))
                }
            }
        } else {
            Classification {
                mood: entry.mood.clone(),
                genre: entry.genre.clone(),
                energy: entry.energy,
            }
        };
        self.persist(entry, classification).await
    }

    async fn classify(&self, title: &str, artist: &str, year: Option<i32>) -> Option<Classification> {
        self.retry
            .run("classifier", || self.classifier.classify(title, artist, year))
            .await
    }

    async fn persist(
        &self,
        mut entry: NewCatalogEntry,
        classification: Classification,
    ) -> EnrichmentReport {
        entry.mood = classification.mood;
        entry.genre = classification.genre.or(entry.genre);
        entry.energy = classification.energy.or(entry.energy);

        if entry.embedding.is_none() {
            if let Some(embedder) = &self.embedder {
                let text = embedding_text(
                    &entry.title,
                    &entry.artist,
                    &entry.mood,
                    entry.genre.as_deref(),
                );
                match self.retry.run("embedding", || embedder.embed(&text)).await {
                    Some(vector) => entry.embedding = Some(vector),
                    None => {
                        return self
                            .finish(EnrichmentReport::Skipped("embedding failed".to_string()))
                    }
                }
            }
        }

        let report = match self.catalog.insert_if_absent(&entry) {
            Ok(Some(inserted)) => {
                info!(entry = %inserted.label(), id = %inserted.id, "Catalog enriched");
                EnrichmentReport::Inserted(inserted)
            }
            Ok(None) => {
                debug!(title = %entry.title, artist = %entry.artist, "Entry already in catalog");
                let stored = self
                    .catalog
                    .find_exact(&entry.title, &entry.artist)
                    .unwrap_or_else(|e| {
                        warn!(error = %e, title = %entry.title, "Stored row lookup failed");
                        None
                    });
                EnrichmentReport::AlreadyPresent(stored)
            }
            Err(e) => {
                warn!(error = %e, title = %entry.title, artist = %entry.artist, "Catalog insert failed");
                EnrichmentReport::Skipped(format!("insert failed: {}", e))
            }
        };
        self.finish(report)
    }

    fn finish(&self, report: EnrichmentReport) -> EnrichmentReport {
        crate::metrics::record_enrichment(report.label());
        report
    }
}
