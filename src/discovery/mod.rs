//! External song discovery, used when the catalog has nothing suitable.

mod filter;
mod youtube;

pub use filter::{clean_video_title, is_compilation, is_primary_channel, split_artist_title};
pub use youtube::YouTubeDiscovery;

use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A normalized discovery result. Low-quality results are filtered out by
/// the provider before one of these is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryHit {
    pub title: String,
    pub artist: String,
    pub external_media_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    /// Best single match for `query`, or `None` when nothing usable came back.
    async fn discover(&self, query: &str) -> Result<Option<DiscoveryHit>, CollaboratorError>;
}
