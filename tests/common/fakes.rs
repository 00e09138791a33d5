//! Counting fakes for the collaborator traits.
//!
//! Each fake records how often it was called so tests can assert that a
//! stage was (or was not) reached.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use vibe_resolver::classify::{Classification, TrackClassifier};
use vibe_resolver::discovery::{DiscoveryHit, DiscoveryProvider};
use vibe_resolver::embedding::EmbeddingProvider;
use vibe_resolver::error::CollaboratorError;
use vibe_resolver::interpreter::{ChatTurn, RequestExtractor};

pub const EMBEDDING_DIM: usize = 32;

/// Bag-of-words vector: each word is hashed (FNV-1a) into one of
/// `EMBEDDING_DIM` buckets. Texts sharing words score a positive cosine.
pub fn hashed_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(0xcbf29ce484222325u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x100000001b3)
            });
        vector[(hash % EMBEDDING_DIM as u64) as usize] += 1.0;
    }
    vector
}

/// Replies with a canned extraction payload per utterance. Unknown
/// utterances are not requests.
pub struct ScriptedExtractor {
    script: HashMap<String, String>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new(script: &[(&str, &str)]) -> Self {
        Self {
            script: script
                .iter()
                .map(|(utterance, payload)| (utterance.to_string(), payload.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestExtractor for ScriptedExtractor {
    async fn extract(
        &self,
        utterance: &str,
        _history: &[ChatTurn],
    ) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .script
            .get(utterance)
            .cloned()
            .unwrap_or_else(|| r#"{"isRequest": false}"#.to_string()))
    }
}

pub struct HashingEmbedder {
    calls: AtomicUsize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(hashed_vector(text))
    }
}

/// Returns the same hit for every query and remembers the queries.
pub struct FixedDiscovery {
    hit: Option<DiscoveryHit>,
    queries: Mutex<Vec<String>>,
}

impl FixedDiscovery {
    pub fn new(hit: Option<DiscoveryHit>) -> Self {
        Self {
            hit,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscoveryProvider for FixedDiscovery {
    async fn discover(&self, query: &str) -> Result<Option<DiscoveryHit>, CollaboratorError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.hit.clone())
    }
}

/// Classifies known titles, fails on anything else.
pub struct TableClassifier {
    table: HashMap<String, Classification>,
    calls: AtomicUsize,
}

impl TableClassifier {
    pub fn new(table: &[(&str, Classification)]) -> Self {
        Self {
            table: table
                .iter()
                .map(|(title, c)| (title.to_string(), c.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackClassifier for TableClassifier {
    async fn classify(
        &self,
        title: &str,
        _artist: &str,
        _year: Option<i32>,
    ) -> Result<Classification, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(title)
            .cloned()
            .ok_or_else(|| CollaboratorError::InvalidResponse(format!("unknown title {}", title)))
    }
}
