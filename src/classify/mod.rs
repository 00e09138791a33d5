//! Mood/genre/energy classification of a track.

mod llm;

pub use llm::LlmTrackClassifier;

use crate::catalog::normalize_moods;
use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub mood: BTreeSet<String>,
    pub genre: Option<String>,
    /// 0.0..=1.0
    pub energy: Option<f32>,
}

impl Classification {
    pub fn new<I, S>(moods: I, genre: Option<&str>, energy: Option<f32>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            mood: normalize_moods(moods),
            genre: genre
                .map(|g| g.trim().to_lowercase())
                .filter(|g| !g.is_empty()),
            energy: energy.map(|e| e.clamp(0.0, 1.0)),
        }
    }
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait TrackClassifier: Send + Sync {
    async fn classify(
        &self,
        title: &str,
        artist: &str,
        year: Option<i32>,
    ) -> Result<Classification, CollaboratorError>;
}
