use super::context::{derive_pending_proposal, is_affirmation};
use super::extractor::{strip_code_fence, RequestExtractor};
use super::models::{StructuredRequest, TurnInput};
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Extractor payload as it arrives on the wire. `isRequest` is required;
/// everything else may be missing or null.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionPayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    is_request: Option<bool>,
    #[serde(default)]
    search_variations: Option<Vec<String>>,
}

pub struct RequestInterpreter {
    extractor: Arc<dyn RequestExtractor>,
    retry: RetryPolicy,
    history_window: usize,
}

impl RequestInterpreter {
    pub fn new(extractor: Arc<dyn RequestExtractor>, retry: RetryPolicy, history_window: usize) -> Self {
        Self {
            extractor,
            retry,
            history_window,
        }
    }

    /// Turn one utterance into a structured request. Never fails: anything
    /// that goes wrong yields [`StructuredRequest::not_a_request`].
    pub async fn interpret(&self, input: &TurnInput) -> StructuredRequest {
        if is_affirmation(&input.utterance) {
            let proposal = input
                .pending_proposal
                .clone()
                .or_else(|| derive_pending_proposal(&input.history));
            if let Some(proposal) = proposal {
                debug!(
                    title = %proposal.title,
                    artist = %proposal.artist,
                    "Affirmation resolved to pending proposal"
                );
                return proposal.into();
            }
        }

        let start = input.history.len().saturating_sub(self.history_window);
        let history = &input.history[start..];
        let utterance = input.utterance.as_str();

        let Some(payload) = self
            .retry
            .run("extractor", || self.extractor.extract(utterance, history))
            .await
        else {
            return StructuredRequest::not_a_request();
        };

        decode_payload(&payload).unwrap_or_else(StructuredRequest::not_a_request)
    }
}

fn decode_payload(payload: &str) -> Option<StructuredRequest> {
    let json = strip_code_fence(payload);
    let parsed: ExtractionPayload = match serde_json::from_str(json) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Extractor returned undecodable payload");
            return None;
        }
    };

    let Some(is_request) = parsed.is_request else {
        warn!("Extractor payload is missing isRequest");
        return None;
    };

    Some(
        StructuredRequest {
            title: parsed.title,
            artist: parsed.artist,
            is_request,
            search_variations: parsed.search_variations.unwrap_or_default(),
        }
        .normalized(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::interpreter::extractor::MockRequestExtractor;
    use crate::interpreter::models::{ChatTurn, PendingProposal};
    use std::time::Duration;

    fn interpreter(extractor: MockRequestExtractor) -> RequestInterpreter {
        RequestInterpreter::new(
            Arc::new(extractor),
            RetryPolicy::no_retry(Duration::from_secs(1)),
            4,
        )
    }

    fn returning(payload: &'static str) -> MockRequestExtractor {
        let mut extractor = MockRequestExtractor::new();
        extractor
            .expect_extract()
            .times(1)
            .returning(move |_, _| Ok(payload.to_string()));
        extractor
    }

    #[tokio::test]
    async fn test_decodes_fenced_payload() {
        let interpreter = interpreter(returning(
            "```json\n{\"title\": \"Blinding Lights\", \"artist\": \"The Weeknd\", \"isRequest\": true, \"searchVariations\": []}\n```",
        ));

        let request = interpreter
            .interpret(&TurnInput::new("play Blinding Lights by The Weeknd"))
            .await;
        assert_eq!(request, StructuredRequest::song("Blinding Lights", "The Weeknd"));
    }

    #[tokio::test]
    async fn test_missing_is_request_fails_soft() {
        let interpreter = interpreter(returning(r#"{"title": "Hello"}"#));
        let request = interpreter.interpret(&TurnInput::new("Hello")).await;
        assert_eq!(request, StructuredRequest::not_a_request());
    }

    #[tokio::test]
    async fn test_garbage_payload_fails_soft() {
        let interpreter = interpreter(returning("Sure! I'd love to help."));
        let request = interpreter.interpret(&TurnInput::new("play something")).await;
        assert!(!request.is_request);
    }

    #[tokio::test]
    async fn test_extractor_error_fails_soft() {
        let mut extractor = MockRequestExtractor::new();
        extractor
            .expect_extract()
            .returning(|_, _| Err(CollaboratorError::Api {
                status: 500,
                message: "boom".to_string(),
            }));
        let request = interpreter(extractor)
            .interpret(&TurnInput::new("play Hello"))
            .await;
        assert_eq!(request, StructuredRequest::not_a_request());
    }

    #[tokio::test]
    async fn test_null_fields_and_blank_strings() {
        let interpreter = interpreter(returning(
            r#"{"title": null, "artist": "  Adele ", "isRequest": true, "searchVariations": null}"#,
        ));
        let request = interpreter.interpret(&TurnInput::new("anything by adele")).await;
        assert_eq!(request, StructuredRequest::by_artist("Adele"));
    }

    #[tokio::test]
    async fn test_affirmation_uses_explicit_proposal_without_extractor() {
        let mut extractor = MockRequestExtractor::new();
        extractor.expect_extract().never();

        let input = TurnInput::new("Yes!").with_pending_proposal(PendingProposal::new("Hello", "Adele"));
        let request = interpreter(extractor).interpret(&input).await;
        assert_eq!(request, StructuredRequest::song("Hello", "Adele"));
    }

    #[tokio::test]
    async fn test_affirmation_derives_proposal_from_history() {
        let mut extractor = MockRequestExtractor::new();
        extractor.expect_extract().never();

        let input = TurnInput::new("go for it").with_history(vec![
            ChatTurn::user("something sad?"),
            ChatTurn::assistant("How about \"Someone Like You\" by Adele?"),
        ]);
        let request = interpreter(extractor).interpret(&input).await;
        assert_eq!(request, StructuredRequest::song("Someone Like You", "Adele"));
    }

    #[tokio::test]
    async fn test_affirmation_without_proposal_goes_to_extractor() {
        let interpreter = interpreter(returning(r#"{"isRequest": false}"#));
        let request = interpreter.interpret(&TurnInput::new("ok")).await;
        assert!(!request.is_request);
    }

    #[tokio::test]
    async fn test_only_recent_history_is_forwarded() {
        let mut extractor = MockRequestExtractor::new();
        extractor
            .expect_extract()
            .withf(|_, history| {
                history.len() == 4 && history[0].content == "turn 2"
            })
            .times(1)
            .returning(|_, _| Ok(r#"{"isRequest": false}"#.to_string()));

        let history = (0..6).map(|i| ChatTurn::user(format!("turn {}", i))).collect();
        let input = TurnInput::new("play something").with_history(history);
        interpreter(extractor).interpret(&input).await;
    }
}
