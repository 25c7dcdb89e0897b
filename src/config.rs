//! TOML configuration for the grounding pipeline.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Maximum chunks handed to the generation model.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    /// Maximum total characters across selected chunks.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Chunks sampled per document when no chunk scores above zero.
    #[serde(default = "default_fallback_chunks_per_doc")]
    pub fallback_chunks_per_doc: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_chunks: default_max_chunks(),
            max_chars: default_max_chars(),
            fallback_chunks_per_doc: default_fallback_chunks_per_doc(),
        }
    }
}

fn default_max_chunks() -> usize {
    20
}
fn default_max_chars() -> usize {
    6000
}
fn default_fallback_chunks_per_doc() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Background worker tasks draining the ingestion queue.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Age after which a `pending`/`processing` document counts as stalled
    /// and is re-enqueued by the startup recovery sweep.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

fn default_workers() -> usize {
    2
}
fn default_stale_after_secs() -> i64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    /// `"openai"` or `"disabled"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Chat-completions endpoint; defaults to the OpenAI API.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}

impl CompletionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be smaller than chunking.chunk_size");
    }
    if config.retrieval.max_chunks == 0 {
        anyhow::bail!("retrieval.max_chunks must be >= 1");
    }
    if config.retrieval.max_chars == 0 {
        anyhow::bail!("retrieval.max_chars must be >= 1");
    }
    if config.ingest.workers == 0 {
        anyhow::bail!("ingest.workers must be >= 1");
    }
    if config.ingest.stale_after_secs < 0 {
        anyhow::bail!("ingest.stale_after_secs must not be negative");
    }

    if config.completion.is_enabled() {
        if config.completion.model.is_none() {
            anyhow::bail!(
                "completion.model must be specified when provider is '{}'",
                config.completion.provider
            );
        }
    }
    match config.completion.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown completion provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(config)
}
