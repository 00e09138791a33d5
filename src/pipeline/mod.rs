//! The `resolve` entry point: interpretation, staged resolution, vibe
//! validation, then suggestions or enrichment.

mod outcome;
mod request_pipeline;

pub use crate::resolver::SourceKind;
pub use outcome::{ResolutionOutcome, ResolutionStatus};
pub use request_pipeline::RequestPipeline;
