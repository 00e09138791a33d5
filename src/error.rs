//! Errors raised by external collaborators (LLM, embedding, discovery).

use crate::agent::llm::LlmError;
use thiserror::Error;

/// Failure of a call to an external collaborator.
///
/// None of these ever reach the caller of `resolve`: the pipeline logs them
/// and treats the stage as having produced nothing.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Timeout")]
    Timeout,

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl CollaboratorError {
    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollaboratorError::Connection(_)
            | CollaboratorError::RateLimited
            | CollaboratorError::Timeout => true,
            CollaboratorError::Api { status, .. } => *status >= 500,
            CollaboratorError::InvalidResponse(_) | CollaboratorError::NotConfigured(_) => false,
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CollaboratorError::Timeout
        } else {
            CollaboratorError::Connection(e.to_string())
        }
    }
}

impl From<LlmError> for CollaboratorError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Connection(msg) => CollaboratorError::Connection(msg),
            LlmError::Api { status, message } => CollaboratorError::Api { status, message },
            LlmError::InvalidResponse(msg) => CollaboratorError::InvalidResponse(msg),
            LlmError::RateLimited => CollaboratorError::RateLimited,
            LlmError::Timeout => CollaboratorError::Timeout,
        }
    }
}
