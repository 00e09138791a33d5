use crate::catalog::CatalogEntry;
use crate::enrichment::EnrichmentReport;
use crate::interpreter::StructuredRequest;
use crate::resolver::SourceKind;
use crate::vibe::{evaluate, VibeRuleSet};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionStatus {
    Resolved,
    Rejected,
    NeedsDisambiguation,
    NotFound,
    NotARequest,
}

impl ResolutionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionStatus::Resolved => "resolved",
            ResolutionStatus::Rejected => "rejected",
            ResolutionStatus::NeedsDisambiguation => "needs_disambiguation",
            ResolutionStatus::NotFound => "not_found",
            ResolutionStatus::NotARequest => "not_a_request",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal result of one resolution run.
///
/// Only the constructors build outcomes, so a candidate is present exactly
/// for `Resolved` and `Rejected`, alternatives only accompany `Rejected` and
/// options only accompany `NeedsDisambiguation`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOutcome {
    status: ResolutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate: Option<CatalogEntry>,
    alternatives: Vec<CatalogEntry>,
    options: Vec<CatalogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<SourceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<StructuredRequest>,
    #[serde(skip)]
    enrichment: Option<EnrichmentReport>,
}

impl ResolutionOutcome {
    fn bare(status: ResolutionStatus, request: Option<StructuredRequest>) -> Self {
        Self {
            status,
            candidate: None,
            alternatives: Vec::new(),
            options: Vec::new(),
            source: None,
            reason: None,
            request,
            enrichment: None,
        }
    }

    pub fn not_a_request(request: Option<StructuredRequest>) -> Self {
        let mut outcome = Self::bare(ResolutionStatus::NotARequest, request);
        outcome.reason = Some("Not a song request".to_string());
        outcome
    }

    pub fn not_found(request: StructuredRequest) -> Self {
        let mut outcome = Self::bare(ResolutionStatus::NotFound, Some(request));
        outcome.reason = Some("No matching song found".to_string());
        outcome
    }

    /// Falls back to `NotFound` when there is nothing to choose from.
    pub fn needs_disambiguation(
        request: StructuredRequest,
        mut options: Vec<CatalogEntry>,
        limit: usize,
    ) -> Self {
        options.truncate(limit);
        if options.is_empty() {
            return Self::not_found(request);
        }
        let mut outcome = Self::bare(ResolutionStatus::NeedsDisambiguation, Some(request));
        outcome.reason = Some(format!("{} songs match, pick one", options.len()));
        outcome.options = options;
        outcome
    }

    pub fn resolved(
        request: StructuredRequest,
        candidate: CatalogEntry,
        source: SourceKind,
        reason: impl Into<String>,
    ) -> Self {
        let mut outcome = Self::bare(ResolutionStatus::Resolved, Some(request));
        outcome.candidate = Some(candidate);
        outcome.source = Some(source);
        outcome.reason = Some(reason.into());
        outcome
    }

    /// Alternatives are re-checked against `rules` and capped at `limit`;
    /// anything that does not pass is dropped.
    pub fn rejected(
        request: StructuredRequest,
        candidate: CatalogEntry,
        source: SourceKind,
        reason: impl Into<String>,
        alternatives: Vec<CatalogEntry>,
        rules: Option<&VibeRuleSet>,
        limit: usize,
    ) -> Self {
        let mut outcome = Self::bare(ResolutionStatus::Rejected, Some(request));
        outcome.alternatives = alternatives
            .into_iter()
            .filter(|alt| alt.id != candidate.id && evaluate(alt, rules).matches)
            .take(limit)
            .collect();
        outcome.candidate = Some(candidate);
        outcome.source = Some(source);
        outcome.reason = Some(reason.into());
        outcome
    }

    /// The stored row replaces the transient discovery candidate, whichever
    /// run inserted it.
    pub(crate) fn with_enrichment(mut self, report: EnrichmentReport) -> Self {
        let stored = match &report {
            EnrichmentReport::Inserted(row) => Some(row),
            EnrichmentReport::AlreadyPresent(row) => row.as_ref(),
            EnrichmentReport::Skipped(_) => None,
        };
        if let (Some(row), Some(_)) = (stored, &self.candidate) {
            self.candidate = Some(row.clone());
        }
        self.enrichment = Some(report);
        self
    }

    pub fn status(&self) -> ResolutionStatus {
        self.status
    }

    pub fn candidate(&self) -> Option<&CatalogEntry> {
        self.candidate.as_ref()
    }

    pub fn alternatives(&self) -> &[CatalogEntry] {
        &self.alternatives
    }

    pub fn options(&self) -> &[CatalogEntry] {
        &self.options
    }

    pub fn source(&self) -> Option<SourceKind> {
        self.source
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn request(&self) -> Option<&StructuredRequest> {
        self.request.as_ref()
    }

    /// Set when an accepted discovery candidate went through enrichment.
    pub fn enrichment(&self) -> Option<&EnrichmentReport> {
        self.enrichment.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vibe::BoundedRange;

    fn entry(id: &str, year: i32) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            title: format!("Song {}", id),
            artist: "Band".to_string(),
            album: None,
            year: Some(year),
            mood: Default::default(),
            genre: None,
            energy: None,
            external_media_id: None,
            cover_url: None,
            embedding: None,
        }
    }

    #[test]
    fn test_rejected_drops_failing_alternatives() {
        let rules = VibeRuleSet {
            allowed_era_range: Some(BoundedRange::new(Some(2000), None)),
            ..Default::default()
        };
        let outcome = ResolutionOutcome::rejected(
            StructuredRequest::song("Song c", "Band"),
            entry("c", 1975),
            SourceKind::Catalog,
            "too old",
            vec![
                entry("a", 1990),
                entry("b", 2001),
                entry("c", 1975),
                entry("d", 2010),
                entry("e", 2020),
                entry("f", 2021),
            ],
            Some(&rules),
            3,
        );

        assert_eq!(outcome.status(), ResolutionStatus::Rejected);
        let ids: Vec<&str> = outcome.alternatives().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "e"]);
        assert!(outcome.options().is_empty());
        assert_eq!(outcome.candidate().map(|c| c.id.as_str()), Some("c"));
    }

    #[test]
    fn test_empty_disambiguation_becomes_not_found() {
        let outcome = ResolutionOutcome::needs_disambiguation(StructuredRequest::by_artist("Band"), vec![], 5);
        assert_eq!(outcome.status(), ResolutionStatus::NotFound);
        assert!(outcome.candidate().is_none());
    }

    #[test]
    fn test_disambiguation_options_are_capped() {
        let options = (0..8).map(|i| entry(&i.to_string(), 2010)).collect();
        let outcome = ResolutionOutcome::needs_disambiguation(StructuredRequest::by_artist("Band"), options, 5);
        assert_eq!(outcome.status(), ResolutionStatus::NeedsDisambiguation);
        assert_eq!(outcome.options().len(), 5);
        assert!(outcome.candidate().is_none());
        assert!(outcome.alternatives().is_empty());
    }

    #[test]
    fn test_inserted_row_replaces_discovery_candidate() {
        let mut discovered = entry("discovery:vid", 2011);
        discovered.external_media_id = Some("vid".to_string());
        let mut stored = discovered.clone();
        stored.id = "0b6f".to_string();

        let outcome = ResolutionOutcome::resolved(
            StructuredRequest::song("Song", "Band"),
            discovered,
            SourceKind::Discovery,
            "ok",
        )
        .with_enrichment(EnrichmentReport::Inserted(stored));

        assert_eq!(outcome.candidate().map(|c| c.id.as_str()), Some("0b6f"));
        assert_eq!(outcome.source(), Some(SourceKind::Discovery));
    }

    #[test]
    fn test_row_stored_by_a_concurrent_run_replaces_discovery_candidate() {
        let discovered = entry("discovery:vid", 2011);
        let mut stored = discovered.clone();
        stored.id = "7c1e".to_string();
        let resolved = |report| {
            ResolutionOutcome::resolved(
                StructuredRequest::song("Song", "Band"),
                discovered.clone(),
                SourceKind::Discovery,
                "ok",
            )
            .with_enrichment(report)
        };

        let raced = resolved(EnrichmentReport::AlreadyPresent(Some(stored)));
        assert_eq!(raced.candidate().map(|c| c.id.as_str()), Some("7c1e"));

        let unknown = resolved(EnrichmentReport::AlreadyPresent(None));
        assert_eq!(unknown.candidate().map(|c| c.id.as_str()), Some("discovery:vid"));
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let outcome = ResolutionOutcome::not_a_request(None);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "notARequest");
        assert!(json.get("candidate").is_none());
    }
}
