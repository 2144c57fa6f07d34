//! Ollama `/api/generate` backend.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::Generator;
use crate::config::GenerationConfig;
use crate::http::{build_client, join_url, post_json_with_retry, OLLAMA_BASE_URL};

pub struct OllamaGenerator {
    client: reqwest::Client,
    model: String,
    url: String,
    max_retries: u32,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let json = post_json_with_retry(
            &self.client,
            &join_url(&self.url, "api/generate"),
            &[],
            &body,
            self.max_retries,
            "Ollama",
        )
        .await
        .map_err(|e| anyhow::anyhow!("{} (is Ollama running at {}?)", e, self.url))?;
        parse_generate_response(&json)
    }
}

fn parse_generate_response(json: &Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let json = json!({ "model": "llama3.1", "response": "{}", "done": true });
        assert_eq!(parse_generate_response(&json).unwrap(), "{}");
        assert!(parse_generate_response(&json!({ "done": true })).is_err());
    }
}
