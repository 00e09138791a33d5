use super::{Classification, TrackClassifier};
use crate::agent::llm::{CompletionOptions, LlmProvider, Message};
use crate::error::CollaboratorError;
use crate::interpreter::strip_code_fence;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const CLASSIFY_PROMPT: &str = r#"You label songs for a party DJ.
Given a song, reply with a single JSON object and nothing else:
{"mood": [string], "genre": string|null, "energy": number|null}

- mood: 1 to 4 lowercase single-word moods, e.g. "sad", "happy", "chill", "energetic", "romantic", "dark", "nostalgic".
- genre: one lowercase main genre.
- energy: 0.0 (very calm) to 1.0 (very intense)."#;

#[derive(Debug, Deserialize)]
struct ClassificationPayload {
    #[serde(default)]
    mood: Vec<String>,
    #[serde(default)]
    genre: Option<String>,
    #[serde(default)]
    energy: Option<f32>,
}

/// `TrackClassifier` backed by a chat completion model.
pub struct LlmTrackClassifier {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl LlmTrackClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }
}

fn parse_classification(content: &str) -> Result<Classification, CollaboratorError> {
    let payload: ClassificationPayload = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| CollaboratorError::InvalidResponse(format!("Bad classification: {}", e)))?;
    let classification =
        Classification::new(&payload.mood, payload.genre.as_deref(), payload.energy);
    if classification.mood.is_empty() {
        return Err(CollaboratorError::InvalidResponse(
            "Classification has no moods".to_string(),
        ));
    }
    Ok(classification)
}

#[async_trait]
impl TrackClassifier for LlmTrackClassifier {
    async fn classify(
        &self,
        title: &str,
        artist: &str,
        year: Option<i32>,
    ) -> Result<Classification, CollaboratorError> {
        let song = match year {
            Some(year) => format!("\"{}\" by {} ({})", title, artist, year),
            None => format!("\"{}\" by {}", title, artist),
        };
        let messages = [Message::system(CLASSIFY_PROMPT), Message::user(song)];
        let options = CompletionOptions {
            temperature: 0.0,
            max_tokens: Some(150),
            timeout: self.timeout,
            json_response: true,
        };

        let response = self.llm.complete(&messages, &options).await?;
        parse_classification(&response.into_content()?)
    }
}
