use crate::catalog::CatalogEntry;
use crate::classify::Classification;
use crate::interpreter::StructuredRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution stages, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    ExactMatch,
    ArtistExploration,
    SemanticSearch,
    SubstringFallback,
    Discovery,
}

impl ResolutionStage {
    pub const ORDER: [ResolutionStage; 5] = [
        ResolutionStage::ExactMatch,
        ResolutionStage::ArtistExploration,
        ResolutionStage::SemanticSearch,
        ResolutionStage::SubstringFallback,
        ResolutionStage::Discovery,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResolutionStage::ExactMatch => "exact_match",
            ResolutionStage::ArtistExploration => "artist_exploration",
            ResolutionStage::SemanticSearch => "semantic_search",
            ResolutionStage::SubstringFallback => "substring_fallback",
            ResolutionStage::Discovery => "discovery",
        }
    }

    /// Whether the stage has the fields it needs. Artist-only requests skip
    /// the title searches and go from exploration straight to discovery.
    pub fn applies_to(&self, request: &StructuredRequest) -> bool {
        match self {
            ResolutionStage::ExactMatch => request.title.is_some() && request.artist.is_some(),
            ResolutionStage::ArtistExploration => {
                request.title.is_none() && request.artist.is_some()
            }
            ResolutionStage::SemanticSearch | ResolutionStage::SubstringFallback => {
                request.title.is_some()
            }
            ResolutionStage::Discovery => request.has_target(),
        }
    }
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    Catalog,
    Discovery,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Catalog => "catalog",
            SourceKind::Discovery => "discovery",
        }
    }
}

/// A prospective entry produced by one stage.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub entry: CatalogEntry,
    pub source: SourceKind,
    pub stage: ResolutionStage,
    /// Present for discovery hits that were classified during gating.
    pub classification: Option<Classification>,
}

impl Candidate {
    pub fn from_catalog(entry: CatalogEntry, stage: ResolutionStage) -> Self {
        Self {
            entry,
            source: SourceKind::Catalog,
            stage,
            classification: None,
        }
    }

    /// Discovery candidates are only persisted when they carry a
    /// classification.
    pub fn is_persistable(&self) -> bool {
        self.source == SourceKind::Discovery && self.classification.is_some()
    }
}

/// What the resolver produced for a request.
#[derive(Debug, Clone)]
pub enum ResolverResult {
    Found(Candidate),
    /// Several catalog entries fit an artist-only request.
    Ambiguous(Vec<CatalogEntry>),
    NotFound,
}

/// Result of a single stage attempt.
pub(crate) enum StageOutcome {
    Found(Candidate),
    Ambiguous(Vec<CatalogEntry>),
    Nothing,
}
