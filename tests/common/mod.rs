//! Deterministic providers shared by the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use docsage::embedding::{EmbedRole, EmbeddingProvider, FallbackEmbedder};
use docsage::engine::{Engine, EngineSettings};
use docsage::generation::Generator;
use docsage::store::DocumentStore;

const VOCABULARY: [&str; 6] = ["revenue", "employees", "office", "weather", "lyon", "answer"];

/// Bag-of-keywords vector with a constant bias component, so no vector is
/// ever all zeros.
pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    VOCABULARY
        .iter()
        .map(|word| lower.matches(word).count() as f32)
        .chain(std::iter::once(0.1))
        .collect()
}

#[derive(Clone)]
pub struct KeywordEmbedder {
    name: String,
    pub calls: Arc<AtomicUsize>,
}

impl KeywordEmbedder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("model unavailable")
    }
}

/// Constant vectors of a fixed length that can be switched off mid-test.
#[derive(Clone)]
pub struct SwitchableEmbedder {
    dim: usize,
    pub healthy: Arc<AtomicBool>,
}

impl SwitchableEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for SwitchableEmbedder {
    fn model_name(&self) -> &str {
        "switchable"
    }

    async fn embed(&self, texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>> {
        if !self.healthy.load(Ordering::SeqCst) {
            anyhow::bail!("model switched off");
        }
        Ok(texts.iter().map(|_| vec![1.0; self.dim]).collect())
    }
}

/// Returns a fixed reply (or error) and records every prompt it receives.
pub struct ScriptedGenerator {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

/// Engine with default chunking, `top_k = 5`, and `embedder` as both the
/// primary and fallback model.
pub fn engine_with(embedder: KeywordEmbedder, generator: Arc<ScriptedGenerator>) -> Engine {
    engine_with_settings(EngineSettings::default(), embedder, generator)
}

pub fn engine_with_settings(
    settings: EngineSettings,
    embedder: KeywordEmbedder,
    generator: Arc<ScriptedGenerator>,
) -> Engine {
    let embedder = FallbackEmbedder::new(Arc::new(embedder.clone()), Arc::new(embedder));
    Engine::new(settings, Arc::new(DocumentStore::new()), embedder, generator).unwrap()
}
