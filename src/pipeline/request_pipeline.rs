use super::outcome::ResolutionOutcome;
use crate::agent::llm::{ApiKeySource, LlmProvider, OpenAIProvider};
use crate::catalog::{CatalogStore, SqliteCatalogStore};
use crate::classify::{LlmTrackClassifier, TrackClassifier};
use crate::config::{AppConfig, ResolverSettings};
use crate::discovery::YouTubeDiscovery;
use crate::embedding::{EmbeddingProvider, OpenAIEmbeddingProvider};
use crate::enrichment::CatalogEnrichment;
use crate::interpreter::{LlmRequestExtractor, RequestInterpreter, StructuredRequest, TurnInput};
use crate::resolver::{CandidateResolver, ResolverResult, SourceKind};
use crate::retry::RetryPolicy;
use crate::suggestions::SuggestionFinder;
use crate::vibe::{evaluate, VibeRuleSet};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The per-utterance state machine:
///
/// ```text
/// INTERPRET -> NotARequest
///           -> RESOLVE -> NeedsDisambiguation | NotFound
///                      -> VALIDATE -> Resolved (-> ENRICH when discovered)
///                                  -> Rejected -> SUGGEST
/// ```
///
/// Stages run one after another. No collaborator failure escapes `resolve`;
/// every path ends in one of the outcome statuses.
pub struct RequestPipeline {
    interpreter: RequestInterpreter,
    resolver: CandidateResolver,
    suggestions: SuggestionFinder,
    enrichment: Option<CatalogEnrichment>,
    catalog: Arc<dyn CatalogStore>,
    settings: ResolverSettings,
}

impl RequestPipeline {
    pub fn new(
        interpreter: RequestInterpreter,
        resolver: CandidateResolver,
        catalog: Arc<dyn CatalogStore>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            interpreter,
            resolver,
            suggestions: SuggestionFinder::new(catalog.clone(), settings.clone()),
            enrichment: None,
            catalog,
            settings,
        }
    }

    pub fn with_enrichment(mut self, enrichment: CatalogEnrichment) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    /// Wire the SQLite catalog and the HTTP collaborators described by
    /// `config`. An LLM is required since it backs both interpretation and
    /// classification; embedding and discovery are optional.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm_settings = config
            .llm
            .as_ref()
            .context("An [llm] section (or --llm-base-url and --llm-model) is required")?;

        let catalog: Arc<dyn CatalogStore> = Arc::new(
            SqliteCatalogStore::new(&config.db_path)
                .with_context(|| format!("Failed to open catalog at {:?}", config.db_path))?,
        );
        let retry = RetryPolicy::new(&config.retry);
        let llm_timeout = Duration::from_secs(llm_settings.timeout_secs);

        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAIProvider::new(
            llm_settings.base_url.clone(),
            llm_settings.model.clone(),
            ApiKeySource::from_settings(
                llm_settings.api_key.clone(),
                llm_settings.api_key_command.clone(),
            ),
        ));
        let extractor = Arc::new(LlmRequestExtractor::new(
            llm.clone(),
            llm_settings.temperature,
            llm_timeout,
        ));
        let classifier: Arc<dyn TrackClassifier> =
            Arc::new(LlmTrackClassifier::new(llm, llm_timeout));

        let interpreter =
            RequestInterpreter::new(extractor, retry.clone(), config.resolver.history_window);
        let mut resolver =
            CandidateResolver::new(catalog.clone(), config.resolver.clone(), retry.clone());
        let mut enrichment =
            CatalogEnrichment::new(catalog.clone(), classifier.clone(), retry.clone());

        let collaborator_timeout = Duration::from_secs(config.retry.timeout_secs);
        if let Some(embedding) = &config.embedding {
            let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAIEmbeddingProvider::new(
                embedding.base_url.clone(),
                embedding.model.clone(),
                embedding.dimension,
                embedding.api_key.clone(),
                collaborator_timeout,
            ));
            resolver = resolver.with_embedder(embedder.clone());
            enrichment = enrichment.with_embedder(embedder);
        } else {
            info!("No embedding provider configured, semantic search disabled");
        }

        if let Some(discovery) = &config.discovery {
            resolver = resolver.with_discovery(
                Arc::new(YouTubeDiscovery::new(
                    discovery.base_url.clone(),
                    discovery.api_key.clone(),
                    discovery.max_results,
                    collaborator_timeout,
                )),
                classifier,
            );
        } else {
            info!("No discovery API key configured, discovery disabled");
        }

        Ok(Self::new(interpreter, resolver, catalog, config.resolver.clone())
            .with_enrichment(enrichment))
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.catalog
    }

    pub fn enrichment(&self) -> Option<&CatalogEnrichment> {
        self.enrichment.as_ref()
    }

    /// Resolve one utterance against `rules`.
    pub async fn resolve(&self, input: TurnInput, rules: Option<&VibeRuleSet>) -> ResolutionOutcome {
        let started = Instant::now();
        let request = self.interpreter.interpret(&input).await;
        let outcome = if request.is_request {
            self.run(request, rules).await
        } else {
            debug!(utterance = %input.utterance, "Utterance is not a song request");
            ResolutionOutcome::not_a_request(Some(request))
        };
        self.finish(outcome, started)
    }

    /// Resolve an already structured request, skipping interpretation.
    pub async fn resolve_request(
        &self,
        request: StructuredRequest,
        rules: Option<&VibeRuleSet>,
    ) -> ResolutionOutcome {
        let started = Instant::now();
        let outcome = self.run(request.normalized(), rules).await;
        self.finish(outcome, started)
    }

    async fn run(&self, request: StructuredRequest, rules: Option<&VibeRuleSet>) -> ResolutionOutcome {
        if !request.has_target() {
            return ResolutionOutcome::not_found(request);
        }

        let candidate = match self.resolver.resolve(&request, rules).await {
            ResolverResult::Found(candidate) => candidate,
            ResolverResult::Ambiguous(options) => {
                return ResolutionOutcome::needs_disambiguation(
                    request,
                    options,
                    self.settings.disambiguation_limit,
                )
            }
            ResolverResult::NotFound => return ResolutionOutcome::not_found(request),
        };

        let check = evaluate(&candidate.entry, rules);
        if !check.matches {
            info!(
                candidate = %candidate.entry.label(),
                reason = %check.reason,
                "Candidate rejected by vibe rules"
            );
            let alternatives = self.suggestions.find_alternatives(&candidate.entry, rules);
            return ResolutionOutcome::rejected(
                request,
                candidate.entry,
                candidate.source,
                check.reason,
                alternatives,
                rules,
                self.settings.max_alternatives,
            );
        }

        let outcome = ResolutionOutcome::resolved(
            request,
            candidate.entry.clone(),
            candidate.source,
            check.reason,
        );
        if candidate.source != SourceKind::Discovery {
            return outcome;
        }
        match &self.enrichment {
            Some(enrichment) => {
                let report = enrichment.enrich(&candidate).await;
                debug!(result = report.label(), "Enrichment finished");
                outcome.with_enrichment(report)
            }
            None => {
                warn!(
                    candidate = %candidate.entry.label(),
                    "Discovery hit accepted but enrichment is disabled"
                );
                outcome
            }
        }
    }

    fn finish(&self, outcome: ResolutionOutcome, started: Instant) -> ResolutionOutcome {
        let elapsed = started.elapsed();
        crate::metrics::record_outcome(outcome.status().label(), elapsed);
        info!(
            status = %outcome.status(),
            source = outcome.source().map(|s| s.label()).unwrap_or("none"),
            candidate = %outcome.candidate().map(|c| c.label()).unwrap_or_default(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Resolution finished"
        );
        outcome
    }
}
