//! Vibe policy model and the pure rule engine that checks catalog entries
//! against it.

mod engine;
mod rules;

pub use engine::evaluate;
pub use rules::{BoundedRange, VibeCheckResult, VibeRuleSet};
