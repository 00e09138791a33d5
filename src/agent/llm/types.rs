//! Common types for LLM interactions.

use super::provider::LlmError;
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A message in a conversation with an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Why an LLM completion finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Cut off by `max_tokens`.
    MaxTokens,
}

/// A single completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: Message,
    pub finish_reason: FinishReason,
}

impl CompletionResponse {
    /// The reply text. A reply cut off by the token limit is an error since
    /// callers parse it as a JSON object.
    pub fn into_content(self) -> Result<String, LlmError> {
        match self.finish_reason {
            FinishReason::Stop => Ok(self.message.content),
            FinishReason::MaxTokens => Err(LlmError::InvalidResponse(format!(
                "Completion truncated after {} chars",
                self.message.content.len()
            ))),
        }
    }
}
