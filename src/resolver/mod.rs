//! Staged candidate resolution: exact match, artist exploration, semantic
//! search, substring fallback, then external discovery.

mod candidate_resolver;
mod matching;
mod stages;

pub use candidate_resolver::CandidateResolver;
pub use matching::{
    artist_matches, normalize, significant_words, substring_title_matches, title_overlap_matches,
};
pub use stages::{Candidate, ResolutionStage, ResolverResult, SourceKind};
