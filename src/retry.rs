//! Retry policy for collaborator calls.
//!
//! Every call gets a per-attempt timeout; retryable failures are retried with
//! exponential backoff. An exhausted budget degrades to `None`, which stages
//! treat as "nothing found".

use crate::config::RetrySettings;
use crate::error::CollaboratorError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy implementing exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff duration in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds (cap for exponential growth).
    pub max_backoff_ms: u64,
    /// Multiplier applied to backoff after each retry.
    pub backoff_multiplier: f64,
    /// Timeout applied to each attempt.
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetrySettings) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
            backoff_multiplier: config.backoff_multiplier,
            attempt_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Single attempt, no backoff. Used by tests.
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_multiplier: 1.0,
            attempt_timeout,
        }
    }

    /// Backoff in milliseconds before retry number `retry_count` (0-based):
    /// `initial_backoff * multiplier^retry_count`, capped at `max_backoff_ms`.
    pub fn backoff_ms(&self, retry_count: u32) -> u64 {
        let backoff = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(retry_count as i32);
        backoff.min(self.max_backoff_ms as f64) as u64
    }

    pub fn should_retry(&self, error: &CollaboratorError, retry_count: u32) -> bool {
        error.is_retryable() && retry_count < self.max_retries
    }

    /// Run `op` under the policy. Returns `None` once the budget is spent or a
    /// permanent error is hit; the failure is logged, never propagated.
    pub async fn run<T, F, Fut>(&self, collaborator: &'static str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollaboratorError>>,
    {
        let mut retry_count = 0;
        loop {
            let error = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(Ok(value)) => return Some(value),
                Ok(Err(e)) => e,
                Err(_) => CollaboratorError::Timeout,
            };

            if !self.should_retry(&error, retry_count) {
                warn!(
                    collaborator,
                    attempts = retry_count + 1,
                    error = %error,
                    "Collaborator call failed"
                );
                crate::metrics::record_collaborator_failure(collaborator);
                return None;
            }

            let backoff = self.backoff_ms(retry_count);
            debug!(
                collaborator,
                retry_count,
                backoff_ms = backoff,
                error = %error,
                "Retrying collaborator call"
            );
            tokio::time::sleep(Duration::from_millis(backoff)).await;
            retry_count += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetrySettings::default())
    }
}
