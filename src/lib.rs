//! Vibe Resolver Library
//!
//! Resolves chat song requests against a catalog and a party's vibe rules.

pub mod agent;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod discovery;
pub mod embedding;
pub mod enrichment;
pub mod error;
pub mod interpreter;
pub mod metrics;
pub mod pipeline;
pub mod resolver;
pub mod retry;
pub mod sqlite_persistence;
pub mod suggestions;
pub mod vibe;

// Re-export commonly used types for convenience
pub use catalog::{CatalogEntry, CatalogStore, SqliteCatalogStore};
pub use interpreter::{ChatTurn, PendingProposal, StructuredRequest, TurnInput};
pub use pipeline::{RequestPipeline, ResolutionOutcome, ResolutionStatus, SourceKind};
pub use vibe::{evaluate, VibeCheckResult, VibeRuleSet};
