//! Text generation backends.
//!
//! The answer composer only needs single-shot completion: one prompt in,
//! one string out, no streaming and no conversation state.

mod gemini;
mod ollama;

pub use gemini::GeminiGenerator;
pub use ollama::OllamaGenerator;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{gemini_api_key, GenerationConfig};

#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.0-flash"`).
    fn model_name(&self) -> &str;

    /// Complete `prompt` and return the raw model text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Create the configured generator (`"gemini"` or `"ollama"`).
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiGenerator::new(config, gemini_api_key())?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => anyhow::bail!("Unknown generation provider: {}", other),
    }
}
