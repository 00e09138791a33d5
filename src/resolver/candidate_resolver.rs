use super::matching::{artist_matches, substring_title_matches, title_overlap_matches};
use super::stages::{Candidate, ResolutionStage, ResolverResult, SourceKind, StageOutcome};
use crate::catalog::{CatalogEntry, CatalogStore};
use crate::classify::{Classification, TrackClassifier};
use crate::config::ResolverSettings;
use crate::discovery::{DiscoveryHit, DiscoveryProvider};
use crate::embedding::EmbeddingProvider;
use crate::interpreter::StructuredRequest;
use crate::retry::RetryPolicy;
use crate::vibe::{evaluate, VibeRuleSet};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Staged lookup of a structured request.
///
/// Stages run in [`ResolutionStage::ORDER`] and stop at the first one that
/// produces a result. A stage that is never reached never calls its
/// collaborators.
pub struct CandidateResolver {
    catalog: Arc<dyn CatalogStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    discovery: Option<(Arc<dyn DiscoveryProvider>, Arc<dyn TrackClassifier>)>,
    settings: ResolverSettings,
    retry: RetryPolicy,
}

impl CandidateResolver {
    pub fn new(catalog: Arc<dyn CatalogStore>, settings: ResolverSettings, retry: RetryPolicy) -> Self {
        Self {
            catalog,
            embedder: None,
            discovery: None,
            settings,
            retry,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Discovery hits are classified before they are offered, so the
    /// classifier comes with the provider.
    pub fn with_discovery(
        mut self,
        discovery: Arc<dyn DiscoveryProvider>,
        classifier: Arc<dyn TrackClassifier>,
    ) -> Self {
        self.discovery = Some((discovery, classifier));
        self
    }

    pub async fn resolve(
        &self,
        request: &StructuredRequest,
        rules: Option<&VibeRuleSet>,
    ) -> ResolverResult {
        if !request.has_target() {
            debug!("Request has neither title nor artist");
            return ResolverResult::NotFound;
        }

        for stage in ResolutionStage::ORDER {
            if !stage.applies_to(request) {
                continue;
            }
            debug!(stage = %stage, "Attempting resolution stage");
            match self.attempt(stage, request, rules).await {
                StageOutcome::Found(candidate) => {
                    info!(
                        stage = %stage,
                        candidate = %candidate.entry.label(),
                        "Resolved candidate"
                    );
                    crate::metrics::record_stage_hit(stage.label());
                    return ResolverResult::Found(candidate);
                }
                StageOutcome::Ambiguous(options) => {
                    info!(stage = %stage, options = options.len(), "Request needs disambiguation");
                    crate::metrics::record_stage_hit(stage.label());
                    return ResolverResult::Ambiguous(options);
                }
                StageOutcome::Nothing => {}
            }
        }

        ResolverResult::NotFound
    }

    async fn attempt(
        &self,
        stage: ResolutionStage,
        request: &StructuredRequest,
        rules: Option<&VibeRuleSet>,
    ) -> StageOutcome {
        match stage {
            ResolutionStage::ExactMatch => self.exact_match(request),
            ResolutionStage::ArtistExploration => self.explore_artist(request, rules),
            ResolutionStage::SemanticSearch => self.semantic_search(request).await,
            ResolutionStage::SubstringFallback => self.substring_fallback(request),
            ResolutionStage::Discovery => self.discover(request, rules).await,
        }
    }

    fn exact_match(&self, request: &StructuredRequest) -> StageOutcome {
        let (Some(title), Some(artist)) = (&request.title, &request.artist) else {
            return StageOutcome::Nothing;
        };
        match self.catalog.find_exact(title, artist) {
            Ok(Some(entry)) => {
                StageOutcome::Found(Candidate::from_catalog(entry, ResolutionStage::ExactMatch))
            }
            Ok(None) => StageOutcome::Nothing,
            Err(e) => {
                warn!(error = %e, "Exact catalog lookup failed");
                StageOutcome::Nothing
            }
        }
    }

    fn explore_artist(&self, request: &StructuredRequest, rules: Option<&VibeRuleSet>) -> StageOutcome {
        let Some(artist) = &request.artist else {
            return StageOutcome::Nothing;
        };
        let entries = match self
            .catalog
            .find_by_artist(artist, self.settings.artist_exploration_limit)
        {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, artist = %artist, "Artist lookup failed");
                return StageOutcome::Nothing;
            }
        };

        let mut passing: Vec<CatalogEntry> = entries
            .into_iter()
            .filter(|e| evaluate(e, rules).matches)
            .collect();
        debug!(artist = %artist, passing = passing.len(), "Explored artist catalog");

        match passing.len() {
            0 => StageOutcome::Nothing,
            1 => StageOutcome::Found(Candidate::from_catalog(
                passing.remove(0),
                ResolutionStage::ArtistExploration,
            )),
            _ => {
                passing.truncate(self.settings.disambiguation_limit);
                StageOutcome::Ambiguous(passing)
            }
        }
    }

    /// `[title, variations...]` in priority order.
    fn title_queries(request: &StructuredRequest) -> Vec<&str> {
        request
            .title
            .iter()
            .chain(request.search_variations.iter())
            .map(String::as_str)
            .collect()
    }

    fn hit_is_valid(&self, query: &str, request: &StructuredRequest, entry: &CatalogEntry) -> bool {
        let title_ok = title_overlap_matches(
            query,
            &entry.title,
            self.settings.word_overlap_ratio,
            self.settings.min_significant_word_len,
        );
        let artist_ok = request.artist.as_deref().map_or(true, |artist| {
            artist_matches(artist, &entry.artist, self.settings.min_significant_word_len)
        });
        title_ok && artist_ok
    }

    async fn semantic_search(&self, request: &StructuredRequest) -> StageOutcome {
        let Some(embedder) = &self.embedder else {
            return StageOutcome::Nothing;
        };

        for query in Self::title_queries(request) {
            let text = match &request.artist {
                Some(artist) => format!("{} {}", query, artist),
                None => query.to_string(),
            };
            let Some(vector) = self.retry.run("embedding", || embedder.embed(&text)).await else {
                continue;
            };

            let hits = match self
                .catalog
                .semantic_search(&vector, self.settings.semantic_search_limit)
            {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(error = %e, "Semantic catalog search failed");
                    continue;
                }
            };

            if let Some((entry, score)) = hits
                .into_iter()
                .find(|(entry, _)| self.hit_is_valid(query, request, entry))
            {
                debug!(query, score, "Accepted semantic hit");
                return StageOutcome::Found(Candidate::from_catalog(
                    entry,
                    ResolutionStage::SemanticSearch,
                ));
            }
        }
        StageOutcome::Nothing
    }

    fn substring_fallback(&self, request: &StructuredRequest) -> StageOutcome {
        for query in Self::title_queries(request) {
            let hits = match self.catalog.text_search(query, self.settings.text_search_limit) {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(error = %e, "Text catalog search failed");
                    continue;
                }
            };

            let accepted = hits.into_iter().find(|entry| {
                substring_title_matches(query, &entry.title, self.settings.containment_ratio)
                    && request.artist.as_deref().map_or(true, |artist| {
                        artist_matches(artist, &entry.artist, self.settings.min_significant_word_len)
                    })
            });
            if let Some(entry) = accepted {
                return StageOutcome::Found(Candidate::from_catalog(
                    entry,
                    ResolutionStage::SubstringFallback,
                ));
            }
        }
        StageOutcome::Nothing
    }

    /// Query for the discovery provider. Artist-only requests get the first
    /// allowed mood appended so the search leans toward the vibe.
    pub fn discovery_query(request: &StructuredRequest, rules: Option<&VibeRuleSet>) -> Option<String> {
        match (&request.title, &request.artist) {
            (Some(title), Some(artist)) => Some(format!("{} {}", title, artist)),
            (Some(title), None) => Some(title.clone()),
            (None, Some(artist)) => {
                let mood = rules.and_then(|r| r.allowed_mood_keys().into_iter().next());
                Some(match mood {
                    Some(mood) => format!("{} {}", artist, mood),
                    None => artist.clone(),
                })
            }
            (None, None) => None,
        }
    }

    async fn discover(&self, request: &StructuredRequest, rules: Option<&VibeRuleSet>) -> StageOutcome {
        let Some((discovery, classifier)) = &self.discovery else {
            return StageOutcome::Nothing;
        };
        let Some(query) = Self::discovery_query(request, rules) else {
            return StageOutcome::Nothing;
        };

        let hit = match self.retry.run("discovery", || discovery.discover(&query)).await {
            Some(Some(hit)) => hit,
            _ => return StageOutcome::Nothing,
        };

        let classification = self
            .retry
            .run("classifier", || {
                classifier.classify(&hit.title, &hit.artist, hit.year)
            })
            .await;
        if classification.is_none() {
            warn!(title = %hit.title, artist = %hit.artist, "Discovery hit left unclassified");
        }

        let entry = discovery_entry(&hit, classification.as_ref());
        StageOutcome::Found(Candidate {
            entry,
            source: SourceKind::Discovery,
            stage: ResolutionStage::Discovery,
            classification,
        })
    }
}

fn discovery_entry(
    hit: &DiscoveryHit,
    classification: Option<&Classification>,
) -> CatalogEntry {
    CatalogEntry {
        id: format!("discovery:{}", hit.external_media_id),
        title: hit.title.clone(),
        artist: hit.artist.clone(),
        album: None,
        year: hit.year,
        mood: classification.map(|c| c.mood.clone()).unwrap_or_else(BTreeSet::new),
        genre: classification.and_then(|c| c.genre.clone()),
        energy: classification.and_then(|c| c.energy),
        external_media_id: Some(hit.external_media_id.clone()),
        cover_url: hit.cover_url.clone(),
        embedding: None,
    }
}
