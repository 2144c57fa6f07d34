//! Embedding provider abstraction, backends, and the primary/fallback pair.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`GeminiEmbedder`]**: calls the Gemini `batchEmbedContents` API.
//! - **[`OllamaEmbedder`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **`LocalEmbedder`**: runs models locally via fastembed (feature
//!   `local-embeddings-fastembed`); no network calls after model download.
//!
//! Callers never use a provider directly: [`FallbackEmbedder`] wraps a
//! primary and a secondary provider and retries a failed batch against the
//! secondary before giving up.
//!
//! # Provider Selection
//!
//! Use [`create_embedder`] to build the pair from configuration: both the
//! primary and fallback model run on the configured provider.

mod gemini;
#[cfg(feature = "local-embeddings-fastembed")]
mod local;
mod ollama;

pub use gemini::GeminiEmbedder;
#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalEmbedder;
pub use ollama::OllamaEmbedder;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{gemini_api_key, EmbeddingConfig};
use crate::error::DocSageError;

/// How the embedded text will be used. Backends that support task-specific
/// embeddings frame the request accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedRole {
    /// Chunks being indexed for later retrieval.
    Document,
    /// A user question being matched against indexed chunks.
    Query,
}

/// A single embedding backend addressing one model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-004"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String], role: EmbedRole) -> Result<Vec<Vec<f32>>>;
}

/// A primary provider with a secondary to fall back on.
///
/// The whole batch goes to one model, so every vector of a document shares
/// the same dimensionality.
#[derive(Clone)]
pub struct FallbackEmbedder {
    primary: Arc<dyn EmbeddingProvider>,
    fallback: Arc<dyn EmbeddingProvider>,
}

impl FallbackEmbedder {
    pub fn new(primary: Arc<dyn EmbeddingProvider>, fallback: Arc<dyn EmbeddingProvider>) -> Self {
        Self { primary, fallback }
    }

    /// Embed `texts`, trying the primary model first and the fallback model
    /// if the primary fails or returns the wrong number of vectors.
    pub async fn embed(
        &self,
        texts: &[String],
        role: EmbedRole,
    ) -> Result<Vec<Vec<f32>>, DocSageError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let primary_err = match embed_checked(self.primary.as_ref(), texts, role).await {
            Ok(vectors) => return Ok(vectors),
            Err(e) => e,
        };
        tracing::warn!(
            primary = self.primary.model_name(),
            fallback = self.fallback.model_name(),
            error = %primary_err,
            "primary embedding model failed, trying fallback"
        );

        embed_checked(self.fallback.as_ref(), texts, role)
            .await
            .map_err(|fallback_err| {
                tracing::error!(
                    model = self.fallback.model_name(),
                    error = %fallback_err,
                    "fallback embedding model failed"
                );
                DocSageError::Embedding {
                    primary: format!("{}: {}", self.primary.model_name(), primary_err),
                    fallback: format!("{}: {}", self.fallback.model_name(), fallback_err),
                }
            })
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, DocSageError> {
        let mut vectors = self.embed(&[text.to_string()], EmbedRole::Query).await?;
        Ok(vectors.pop().unwrap_or_default())
    }
}

async fn embed_checked(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    role: EmbedRole,
) -> Result<Vec<Vec<f32>>> {
    let vectors = provider.embed(texts, role).await?;
    if vectors.len() != texts.len() {
        anyhow::bail!(
            "expected {} embeddings, got {}",
            texts.len(),
            vectors.len()
        );
    }
    if vectors.iter().any(|v| v.is_empty()) {
        anyhow::bail!("response contained an empty embedding");
    }
    Ok(vectors)
}

/// Create the primary/fallback pair for the configured provider.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"gemini"` | [`GeminiEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"local"` | `LocalEmbedder` (requires `local-embeddings-fastembed`) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<FallbackEmbedder> {
    let make = |model: &str| -> Result<Arc<dyn EmbeddingProvider>> {
        match config.provider.as_str() {
            "gemini" => Ok(Arc::new(GeminiEmbedder::new(
                config,
                model,
                gemini_api_key(),
            )?)),
            "ollama" => Ok(Arc::new(OllamaEmbedder::new(config, model)?)),
            #[cfg(feature = "local-embeddings-fastembed")]
            "local" => Ok(Arc::new(LocalEmbedder::new(model)?)),
            #[cfg(not(feature = "local-embeddings-fastembed"))]
            "local" => anyhow::bail!(
                "Local embedding provider requires --features local-embeddings-fastembed"
            ),
            other => anyhow::bail!("Unknown embedding provider: {}", other),
        }
    };

    Ok(FallbackEmbedder::new(
        make(&config.primary_model)?,
        make(&config.fallback_model)?,
    ))
}

/// Decode a JSON array of numbers into an embedding vector.
pub(crate) fn parse_vector(value: &serde_json::Value) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("embedding is not an array"))?;
    arr.iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow::anyhow!("embedding contains a non-numeric value"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        dims: usize,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, dims: usize) -> Self {
            Self {
                name,
                dims,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for Fixed {
        fn model_name(&self) -> &str {
            self.name
        }
        async fn embed(&self, texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0; self.dims]).collect())
        }
    }

    struct Failing;

    #[async_trait]
    impl EmbeddingProvider for Failing {
        fn model_name(&self) -> &str {
            "failing"
        }
        async fn embed(&self, _texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("quota exceeded")
        }
    }

    /// Returns one vector fewer than asked for.
    struct ShortBatch;

    #[async_trait]
    impl EmbeddingProvider for ShortBatch {
        fn model_name(&self) -> &str {
            "short"
        }
        async fn embed(&self, texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0]).collect())
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("chunk {}", i)).collect()
    }

    #[tokio::test]
    async fn test_primary_used_when_healthy() {
        let primary = Arc::new(Fixed::new("primary", 4));
        let fallback = Arc::new(Fixed::new("fallback", 8));
        let embedder = FallbackEmbedder::new(primary.clone(), fallback.clone());

        let vectors = embedder.embed(&texts(3), EmbedRole::Document).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0].len(), 4);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_on_primary_error() {
        let fallback = Arc::new(Fixed::new("fallback", 8));
        let embedder = FallbackEmbedder::new(Arc::new(Failing), fallback.clone());

        let vectors = embedder.embed(&texts(5), EmbedRole::Document).await.unwrap();
        assert_eq!(vectors.len(), 5);
        assert!(vectors.iter().all(|v| v.len() == 8));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_back_on_count_mismatch() {
        let embedder = FallbackEmbedder::new(Arc::new(ShortBatch), Arc::new(Fixed::new("fb", 2)));
        let vectors = embedder.embed(&texts(2), EmbedRole::Document).await.unwrap();
        assert_eq!(vectors.len(), 2);
    }

    #[tokio::test]
    async fn test_both_failing_reports_both_causes() {
        let embedder = FallbackEmbedder::new(Arc::new(Failing), Arc::new(ShortBatch));
        let err = embedder
            .embed(&texts(2), EmbedRole::Document)
            .await
            .unwrap_err();
        match err {
            DocSageError::Embedding { primary, fallback } => {
                assert!(primary.contains("quota exceeded"));
                assert!(fallback.contains("expected 2 embeddings"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_calls() {
        let primary = Arc::new(Fixed::new("primary", 4));
        let embedder = FallbackEmbedder::new(primary.clone(), Arc::new(Failing));
        assert!(embedder.embed(&[], EmbedRole::Document).await.unwrap().is_empty());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embed_query_returns_single_vector() {
        let embedder =
            FallbackEmbedder::new(Arc::new(Failing), Arc::new(Fixed::new("fallback", 3)));
        let v = embedder.embed_query("plot revenue").await.unwrap();
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_parse_vector_rejects_non_numbers() {
        assert_eq!(
            parse_vector(&serde_json::json!([1, 2.5])).unwrap(),
            vec![1.0, 2.5]
        );
        assert!(parse_vector(&serde_json::json!([1, "x"])).is_err());
        assert!(parse_vector(&serde_json::json!({})).is_err());
    }

    #[test]
    fn test_create_embedder_unknown_provider() {
        let cfg = EmbeddingConfig {
            provider: "nope".into(),
            ..Default::default()
        };
        assert!(create_embedder(&cfg).is_err());
    }
}
