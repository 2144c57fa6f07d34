//! Gemini embedding backend (`models/{model}:batchEmbedContents`).
//!
//! Document embeddings use task type `RETRIEVAL_DOCUMENT` with the title
//! `"Document Chunks"`; queries use `RETRIEVAL_QUERY`. Batches larger than
//! the API limit are split into consecutive requests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{parse_vector, EmbedRole, EmbeddingProvider};
use crate::config::{EmbeddingConfig, GEMINI_API_KEY_ENV};
use crate::http::{build_client, join_url, post_json_with_retry, GEMINI_BASE_URL};

/// Maximum requests per `batchEmbedContents` call.
const MAX_BATCH: usize = 100;
const DOCUMENT_TITLE: &str = "Document Chunks";

pub struct GeminiEmbedder {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl GeminiEmbedder {
    /// Create an embedder for `model`. A missing API key is not an error
    /// here; requests fail with a descriptive message instead.
    pub fn new(config: &EmbeddingConfig, model: &str, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            model: model.trim_start_matches("models/").to_string(),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            api_key,
            max_retries: config.max_retries,
        })
    }

    fn request_body(&self, texts: &[String], role: EmbedRole) -> Value {
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                let mut req = json!({
                    "model": format!("models/{}", self.model),
                    "content": { "parts": [{ "text": text }] },
                });
                match role {
                    EmbedRole::Document => {
                        req["taskType"] = json!("RETRIEVAL_DOCUMENT");
                        req["title"] = json!(DOCUMENT_TITLE);
                    }
                    EmbedRole::Query => {
                        req["taskType"] = json!("RETRIEVAL_QUERY");
                    }
                }
                req
            })
            .collect();
        json!({ "requests": requests })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String], role: EmbedRole) -> Result<Vec<Vec<f32>>> {
        let api_key = match &self.api_key {
            Some(k) => k,
            None => bail!("{} not set", GEMINI_API_KEY_ENV),
        };
        let url = join_url(
            &self.base_url,
            &format!("v1beta/models/{}:batchEmbedContents", self.model),
        );

        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            tracing::debug!(model = %self.model, batch_size = batch.len(), ?role, "embedding batch");
            let json = post_json_with_retry(
                &self.client,
                &url,
                &[("x-goog-api-key", api_key.as_str())],
                &self.request_body(batch, role),
                self.max_retries,
                "Gemini",
            )
            .await?;
            out.extend(parse_gemini_response(&json)?);
        }
        Ok(out)
    }
}

/// Extract `embeddings[].values` in order.
fn parse_gemini_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|e| {
            let values = e
                .get("values")
                .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing values"))?;
            parse_vector(values)
        })
        .collect()
}
