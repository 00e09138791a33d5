//! Text-to-request extraction capability and its LLM-backed implementation.

use super::models::{ChatRole, ChatTurn};
use crate::agent::llm::{CompletionOptions, LlmProvider, Message};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Turns an utterance plus recent history into a raw JSON payload shaped like
/// a `StructuredRequest`. The payload may be wrapped in a code fence.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait RequestExtractor: Send + Sync {
    async fn extract(
        &self,
        utterance: &str,
        history: &[ChatTurn],
    ) -> Result<String, CollaboratorError>;
}

const EXTRACTION_PROMPT: &str = r#"You read messages from a party chat where guests ask a DJ assistant for songs.
Decide whether the latest message asks for a song to be played and extract what was asked for.

Reply with a single JSON object and nothing else:
{"title": string|null, "artist": string|null, "isRequest": boolean, "searchVariations": [string]}

Rules:
- isRequest is true only if the guest wants a song played or queued.
- Use null for anything not mentioned. Never invent a title for an artist-only request.
- searchVariations lists alternate spellings of the title in priority order: transliterations, spelling fixes, numerals written out or as digits, and alternate titles by the same artist. Leave it empty when there are none.
- Use the earlier messages only to resolve references like "that one" or "the other song"."#;

/// `RequestExtractor` backed by a chat completion model.
pub struct LlmRequestExtractor {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
    timeout: Duration,
}

impl LlmRequestExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, temperature: f32, timeout: Duration) -> Self {
        Self {
            llm,
            temperature,
            timeout,
        }
    }

    fn build_messages(utterance: &str, history: &[ChatTurn]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(EXTRACTION_PROMPT));
        for turn in history {
            messages.push(match turn.role {
                ChatRole::User => Message::user(turn.content.clone()),
                ChatRole::Assistant => Message::assistant(turn.content.clone()),
            });
        }
        messages.push(Message::user(utterance));
        messages
    }
}

#[async_trait]
impl RequestExtractor for LlmRequestExtractor {
    async fn extract(
        &self,
        utterance: &str,
        history: &[ChatTurn],
    ) -> Result<String, CollaboratorError> {
        let options = CompletionOptions {
            temperature: self.temperature,
            max_tokens: Some(300),
            timeout: self.timeout,
            json_response: true,
        };
        let response = self
            .llm
            .complete(&Self::build_messages(utterance, history), &options)
            .await?;
        Ok(response.into_content()?)
    }
}

/// Strip a surrounding ```json ... ``` or ``` ... ``` fence, if any.
pub fn strip_code_fence(payload: &str) -> &str {
    let trimmed = payload.trim();

    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
    }

    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
    }

    trimmed
}
