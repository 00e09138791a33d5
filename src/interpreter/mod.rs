//! Turns a chat utterance plus recent context into a [`StructuredRequest`].

mod context;
mod extractor;
mod models;
mod request_interpreter;

pub use context::{derive_pending_proposal, is_affirmation};
#[cfg(any(test, feature = "mock"))]
pub use extractor::MockRequestExtractor;
pub use extractor::{strip_code_fence, LlmRequestExtractor, RequestExtractor};
pub use models::{ChatRole, ChatTurn, PendingProposal, StructuredRequest, TurnInput};
pub use request_interpreter::RequestInterpreter;
