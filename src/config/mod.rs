mod file_config;

pub use file_config::{
    DiscoveryConfig, EmbeddingConfig, FileConfig, LlmConfig, ResolverConfig, RetryConfig,
};

use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub vibe_path: Option<PathBuf>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub discovery_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_path: PathBuf,
    pub vibe_path: Option<PathBuf>,

    pub resolver: ResolverSettings,
    pub retry: RetrySettings,

    // Collaborators, absent when not configured
    pub llm: Option<LlmSettings>,
    pub embedding: Option<EmbeddingSettings>,
    pub discovery: Option<DiscoverySettings>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let vibe_path = file
            .vibe_path
            .map(PathBuf::from)
            .or_else(|| cli.vibe_path.clone());
        if let Some(path) = &vibe_path {
            if !path.exists() {
                bail!("Vibe file not found: {:?}", path);
            }
        }

        let resolver = ResolverSettings::from_file(file.resolver.unwrap_or_default());
        resolver.validate()?;

        let retry_file = file.retry.unwrap_or_default();
        let retry_defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_retries: retry_file.max_retries.unwrap_or(retry_defaults.max_retries),
            initial_backoff_ms: retry_file
                .initial_backoff_ms
                .unwrap_or(retry_defaults.initial_backoff_ms),
            max_backoff_ms: retry_file
                .max_backoff_ms
                .unwrap_or(retry_defaults.max_backoff_ms),
            backoff_multiplier: retry_file
                .backoff_multiplier
                .unwrap_or(retry_defaults.backoff_multiplier),
            timeout_secs: retry_file.timeout_secs.unwrap_or(retry_defaults.timeout_secs),
        };
        if retry.backoff_multiplier < 1.0 {
            bail!("retry.backoff_multiplier must be >= 1.0");
        }
        if retry.timeout_secs == 0 {
            bail!("retry.timeout_secs must be greater than 0");
        }

        // LLM: enabled when both base_url and model are known
        let llm_file = file.llm.unwrap_or_default();
        let llm_base_url = llm_file.base_url.or_else(|| cli.llm_base_url.clone());
        let llm_model = llm_file.model.or_else(|| cli.llm_model.clone());
        let llm = match (llm_base_url, llm_model) {
            (Some(base_url), Some(model)) => {
                if llm_file.api_key.is_some() && llm_file.api_key_command.is_some() {
                    bail!("llm.api_key and llm.api_key_command are mutually exclusive");
                }
                Some(LlmSettings {
                    base_url,
                    model,
                    api_key: llm_file.api_key,
                    api_key_command: llm_file.api_key_command,
                    temperature: llm_file.temperature.unwrap_or(0.0),
                    timeout_secs: llm_file.timeout_secs.unwrap_or(30),
                })
            }
            (None, None) => None,
            _ => bail!("Both llm base_url and model must be provided together"),
        };

        let embedding = match file.embedding {
            Some(EmbeddingConfig {
                base_url: Some(base_url),
                model: Some(model),
                dimension,
                api_key,
            }) => {
                let dimension = dimension.unwrap_or(DEFAULT_EMBEDDING_DIMENSION);
                if dimension == 0 {
                    bail!("embedding.dimension must be greater than 0");
                }
                Some(EmbeddingSettings {
                    base_url,
                    model,
                    dimension,
                    api_key,
                })
            }
            Some(_) => bail!("[embedding] requires both base_url and model"),
            None => None,
        };

        let discovery_file = file.discovery.unwrap_or_default();
        let discovery = discovery_file
            .api_key
            .or_else(|| cli.discovery_api_key.clone())
            .map(|api_key| DiscoverySettings {
                base_url: discovery_file
                    .base_url
                    .unwrap_or_else(|| DEFAULT_DISCOVERY_BASE_URL.to_string()),
                api_key,
                max_results: discovery_file.max_results.unwrap_or(5),
            });

        Ok(Self {
            db_path,
            vibe_path,
            resolver,
            retry,
            llm,
            embedding,
            discovery,
        })
    }
}

const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const DEFAULT_DISCOVERY_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Thresholds and limits used by the resolver, the interpreter and the
/// suggestion finder.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    pub history_window: usize,
    pub artist_exploration_limit: usize,
    pub disambiguation_limit: usize,
    pub semantic_search_limit: usize,
    pub text_search_limit: usize,
    pub containment_ratio: f64,
    pub word_overlap_ratio: f64,
    pub min_significant_word_len: usize,
    pub max_alternatives: usize,
    pub mood_pool_limit: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            history_window: 4,
            artist_exploration_limit: 20,
            disambiguation_limit: 5,
            semantic_search_limit: 10,
            text_search_limit: 10,
            containment_ratio: 0.5,
            word_overlap_ratio: 0.5,
            min_significant_word_len: 3,
            max_alternatives: 3,
            mood_pool_limit: 50,
        }
    }
}

impl ResolverSettings {
    fn from_file(file: ResolverConfig) -> Self {
        let d = Self::default();
        Self {
            history_window: file.history_window.unwrap_or(d.history_window),
            artist_exploration_limit: file
                .artist_exploration_limit
                .unwrap_or(d.artist_exploration_limit),
            disambiguation_limit: file.disambiguation_limit.unwrap_or(d.disambiguation_limit),
            semantic_search_limit: file.semantic_search_limit.unwrap_or(d.semantic_search_limit),
            text_search_limit: file.text_search_limit.unwrap_or(d.text_search_limit),
            containment_ratio: file.containment_ratio.unwrap_or(d.containment_ratio),
            word_overlap_ratio: file.word_overlap_ratio.unwrap_or(d.word_overlap_ratio),
            min_significant_word_len: file
                .min_significant_word_len
                .unwrap_or(d.min_significant_word_len),
            max_alternatives: file.max_alternatives.unwrap_or(d.max_alternatives),
            mood_pool_limit: file.mood_pool_limit.unwrap_or(d.mood_pool_limit),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.containment_ratio > 0.0 && self.containment_ratio <= 1.0) {
            bail!("resolver.containment_ratio must be in (0, 1]");
        }
        if !(self.word_overlap_ratio > 0.0 && self.word_overlap_ratio <= 1.0) {
            bail!("resolver.word_overlap_ratio must be in (0, 1]");
        }
        if self.artist_exploration_limit == 0
            || self.semantic_search_limit == 0
            || self.text_search_limit == 0
            || self.mood_pool_limit == 0
        {
            bail!("resolver search limits must be greater than 0");
        }
        if self.disambiguation_limit == 0 {
            bail!("resolver.disambiguation_limit must be greater than 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 250,
            max_backoff_ms: 4000,
            backoff_multiplier: 2.0,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub base_url: String,
    pub api_key: String,
    pub max_results: u32,
}
