//! Conversation and request types consumed by the interpreter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One recorded turn of the party chat. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The song the assistant last offered, awaiting a yes/no.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingProposal {
    pub title: String,
    pub artist: String,
}

impl PendingProposal {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

/// Everything the interpreter needs for one utterance.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    pub utterance: String,
    /// Oldest first.
    pub history: Vec<ChatTurn>,
    pub pending_proposal: Option<PendingProposal>,
}

impl TurnInput {
    pub fn new(utterance: impl Into<String>) -> Self {
        Self {
            utterance: utterance.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_pending_proposal(mut self, proposal: PendingProposal) -> Self {
        self.pending_proposal = Some(proposal);
        self
    }
}

/// Parsed intent of an utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub is_request: bool,
    /// Alternate titles in priority order.
    #[serde(default)]
    pub search_variations: Vec<String>,
}

impl StructuredRequest {
    pub fn not_a_request() -> Self {
        Self::default()
    }

    pub fn song(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            artist: Some(artist.into()),
            is_request: true,
            search_variations: Vec::new(),
        }
    }

    pub fn by_artist(artist: impl Into<String>) -> Self {
        Self {
            title: None,
            artist: Some(artist.into()),
            is_request: true,
            search_variations: Vec::new(),
        }
    }

    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            artist: None,
            is_request: true,
            search_variations: Vec::new(),
        }
    }

    pub fn with_variations<I, S>(mut self, variations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_variations = variations.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_target(&self) -> bool {
        self.title.is_some() || self.artist.is_some()
    }

    /// Blank strings become `None`; variations are trimmed, deduplicated
    /// (case-insensitively) and stripped of entries equal to the title.
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let title = clean(self.title);
        let artist = clean(self.artist);

        let mut seen: Vec<String> = title.iter().map(|t| t.to_lowercase()).collect();
        let mut search_variations = Vec::new();
        for variation in self.search_variations {
            let variation = variation.trim();
            if variation.is_empty() {
                continue;
            }
            let key = variation.to_lowercase();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            search_variations.push(variation.to_string());
        }

        Self {
            title,
            artist,
            is_request: self.is_request,
            search_variations,
        }
    }
}

impl From<PendingProposal> for StructuredRequest {
    fn from(proposal: PendingProposal) -> Self {
        StructuredRequest::song(proposal.title, proposal.artist)
    }
}
