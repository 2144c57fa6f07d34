//! TOML configuration parsing and validation.
//!
//! Every section has defaults, so an empty file (or [`Config::minimal`])
//! is a working configuration. Secrets never live in the file: the Gemini
//! API key comes from `GEMINI_API_KEY`, and `PORT` overrides the port of
//! `server.bind` for hosted deployments.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunk::{DEFAULT_OVERLAP, DEFAULT_WINDOW};

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}
fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_primary_embedding_model")]
    pub primary_model: String,
    #[serde(default = "default_fallback_embedding_model")]
    pub fallback_model: String,
    /// Base URL override (Gemini endpoint or Ollama instance).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            primary_model: default_primary_embedding_model(),
            fallback_model: default_fallback_embedding_model(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_generation_model(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_primary_embedding_model() -> String {
    "text-embedding-004".to_string()
}
fn default_fallback_embedding_model() -> String {
    "embedding-001".to_string()
}
fn default_generation_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_max_retries() -> u32 {
    2
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_generation_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Directory with the browser frontend (`index.html` at its root).
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            static_dir: None,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

impl Config {
    /// All-defaults configuration, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Check invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.window == 0 {
            anyhow::bail!("chunking.window must be > 0");
        }
        if self.chunking.overlap >= self.chunking.window {
            anyhow::bail!(
                "chunking.overlap ({}) must be smaller than chunking.window ({})",
                self.chunking.overlap,
                self.chunking.window
            );
        }

        if self.retrieval.top_k < 1 {
            anyhow::bail!("retrieval.top_k must be >= 1");
        }

        check_provider("embedding", &self.embedding.provider)?;
        check_provider("generation", &self.generation.provider)?;

        if self.embedding.primary_model.trim().is_empty()
            || self.embedding.fallback_model.trim().is_empty()
        {
            anyhow::bail!("embedding.primary_model and embedding.fallback_model must be set");
        }
        if self.generation.model.trim().is_empty() {
            anyhow::bail!("generation.model must be set");
        }

        Ok(())
    }

    /// Apply environment overrides (`PORT`).
    pub fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            self.server.bind = with_port(&self.server.bind, &port);
        }
    }

    /// Whether any configured backend needs the Gemini API key.
    pub fn needs_gemini_key(&self) -> bool {
        self.embedding.provider == "gemini" || self.generation.provider == "gemini"
    }
}

fn check_provider(section: &str, provider: &str) -> Result<()> {
    match provider {
        "gemini" | "ollama" => Ok(()),
        "local" if section == "embedding" => Ok(()),
        other => anyhow::bail!(
            "Unknown {} provider: '{}'. Must be gemini or ollama{}.",
            section,
            other,
            if section == "embedding" { " (or local)" } else { "" }
        ),
    }
}

/// Replace the port of a `host:port` bind address.
fn with_port(bind: &str, port: &str) -> String {
    let host = bind.rsplit_once(':').map(|(h, _)| h).unwrap_or(bind);
    format!("{}:{}", host, port.trim())
}

/// Read the Gemini API key from the environment.
pub fn gemini_api_key() -> Option<String> {
    std::env::var(GEMINI_API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty())
}

/// Parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to
/// [`Config::minimal`]. Environment overrides are applied either way.
pub fn load_or_default(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        load_config(path)?
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Config::minimal()
    };
    config.apply_env();
    Ok(config)
}
