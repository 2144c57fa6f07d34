//! Ollama embedding backend (`POST /api/embed`).
//!
//! Requires Ollama to be running with the model pulled
//! (e.g. `ollama pull nomic-embed-text`). Ollama has no task types, so
//! document and query embeddings are requested the same way.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::{parse_vector, EmbedRole, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::http::{build_client, join_url, post_json_with_retry, OLLAMA_BASE_URL};

pub struct OllamaEmbedder {
    client: reqwest::Client,
    model: String,
    url: String,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig, model: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            model: model.to_string(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = post_json_with_retry(
            &self.client,
            &join_url(&self.url, "api/embed"),
            &[],
            &body,
            self.max_retries,
            "Ollama",
        )
        .await
        .map_err(|e| anyhow::anyhow!("{} (is Ollama running at {}?)", e, self.url))?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    embeddings.iter().map(parse_vector).collect()
}
