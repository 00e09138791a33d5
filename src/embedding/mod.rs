//! Text embedding capability.
//!
//! The resolver embeds search queries for semantic lookup and the enrichment
//! step embeds a normalized description of each new catalog row.

mod openai;

pub use openai::OpenAIEmbeddingProvider;

use crate::error::CollaboratorError;
use async_trait::async_trait;

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError>;
}

/// Text embedded for a catalog row: `title | artist | moods | genre`,
/// lowercased and whitespace-collapsed. Empty parts are kept as empty slots so
/// the layout stays stable.
pub fn embedding_text<'a, I>(title: &str, artist: &str, moods: I, genre: Option<&str>) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let moods = moods
        .into_iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    [title, artist, moods.as_str(), genre.unwrap_or("")]
        .iter()
        .map(|part| collapse(part))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn collapse(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
