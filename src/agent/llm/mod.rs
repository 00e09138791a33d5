//! LLM provider abstraction layer.
//!
//! The request extractor and the track classifier both talk to an
//! OpenAI-compatible chat completions backend through [`LlmProvider`].

mod openai;
mod provider;
mod types;

pub use openai::{ApiKeySource, OpenAIProvider};
#[cfg(any(test, feature = "mock"))]
pub use provider::MockLlmProvider;
pub use provider::{CompletionOptions, LlmError, LlmProvider};
pub use types::{CompletionResponse, FinishReason, Message, MessageRole};
