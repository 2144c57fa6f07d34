//! Gemini `generateContent` backend.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::Generator;
use crate::config::{GenerationConfig, GEMINI_API_KEY_ENV};
use crate::http::{build_client, join_url, post_json_with_retry, GEMINI_BASE_URL};

pub struct GeminiGenerator {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            model: config.model.trim_start_matches("models/").to_string(),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            api_key,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = match &self.api_key {
            Some(k) => k,
            None => bail!("{} not set", GEMINI_API_KEY_ENV),
        };
        let url = join_url(
            &self.base_url,
            &format!("v1beta/models/{}:generateContent", self.model),
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let json = post_json_with_retry(
            &self.client,
            &url,
            &[("x-goog-api-key", api_key.as_str())],
            &body,
            self.max_retries,
            "Gemini",
        )
        .await?;
        parse_generate_response(&json)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_generate_response(json: &Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates");
            anyhow::anyhow!("Invalid Gemini response: {}", reason)
        })?;

    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}
