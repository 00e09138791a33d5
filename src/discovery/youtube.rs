//! YouTube Data API v3 discovery provider.

use super::filter::{
    channel_artist, clean_video_title, decode_entities, is_compilation, is_derivative,
    is_primary_channel, split_artist_title,
};
use super::{DiscoveryHit, DiscoveryProvider};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// YouTube category id for Music.
const MUSIC_CATEGORY_ID: &str = "10";

pub struct YouTubeDiscovery {
    client: Client,
    base_url: String,
    api_key: String,
    max_results: u32,
    timeout: Duration,
}

impl YouTubeDiscovery {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        max_results: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_results,
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: String,
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// Normalize one search item, or drop it when it is not a single original
/// recording.
fn to_hit(item: SearchItem) -> Option<(DiscoveryHit, bool)> {
    let video_id = item.id.video_id?;
    let raw_title = decode_entities(&item.snippet.title);
    if is_compilation(&raw_title) || is_derivative(&raw_title) {
        debug!(title = %raw_title, "Skipping non-single upload");
        return None;
    }

    let channel = decode_entities(&item.snippet.channel_title);
    let primary = is_primary_channel(&channel);
    let cleaned = clean_video_title(&raw_title);
    let (artist, title) =
        split_artist_title(&cleaned).unwrap_or_else(|| (channel_artist(&channel), cleaned.clone()));
    if title.is_empty() || artist.is_empty() {
        return None;
    }

    let year = item
        .snippet
        .published_at
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.year());

    let thumbnails = item.snippet.thumbnails;
    let cover_url = thumbnails
        .high
        .or(thumbnails.medium)
        .or(thumbnails.default)
        .map(|t| t.url);

    Some((
        DiscoveryHit {
            title,
            artist,
            external_media_id: video_id,
            cover_url,
            year,
        },
        primary,
    ))
}

/// First primary-channel hit, else the first acceptable hit.
fn pick_best(items: Vec<SearchItem>) -> Option<DiscoveryHit> {
    let hits: Vec<(DiscoveryHit, bool)> = items.into_iter().filter_map(to_hit).collect();
    let primary = hits.iter().position(|(_, primary)| *primary);
    let index = primary.unwrap_or(0);
    hits.into_iter().nth(index).map(|(hit, _)| hit)
}

#[async_trait]
impl DiscoveryProvider for YouTubeDiscovery {
    async fn discover(&self, query: &str) -> Result<Option<DiscoveryHit>, CollaboratorError> {
        let url = format!("{}/search", self.base_url);
        let max_results = self.max_results.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("videoCategoryId", MUSIC_CATEGORY_ID),
                ("maxResults", max_results.as_str()),
                ("q", query),
                ("key", self.api_key.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(CollaboratorError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CollaboratorError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            CollaboratorError::InvalidResponse(format!("Failed to parse search response: {}", e))
        })?;

        let result_count = parsed.items.len();
        let hit = pick_best(parsed.items);
        debug!(query, result_count, found = hit.is_some(), "Discovery search finished");
        Ok(hit)
    }
}
