//! Core data models used throughout DocSage.
//!
//! These types represent the documents, retrieval results, and structured
//! answers that flow through the ingestion and question-answering pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An ingested document held by the [`DocumentStore`](crate::store::DocumentStore).
///
/// `chunks[i]` and `embeddings[i]` always describe the same segment, and
/// every embedding has the same length. A document is never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub chunks: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub full_text: String,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Build a document, checking that every chunk has exactly one embedding.
    pub fn new(
        id: impl Into<String>,
        chunks: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        full_text: impl Into<String>,
    ) -> anyhow::Result<Self> {
        if chunks.len() != embeddings.len() {
            anyhow::bail!(
                "chunk/embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            );
        }
        if let Some(first) = embeddings.first() {
            if let Some(odd) = embeddings.iter().find(|e| e.len() != first.len()) {
                anyhow::bail!(
                    "mixed embedding dimensions: {} and {}",
                    first.len(),
                    odd.len()
                );
            }
        }
        Ok(Self {
            id: id.into(),
            chunks,
            embeddings,
            full_text: full_text.into(),
            created_at: Utc::now(),
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Length of the chunk vectors, `None` for a document without chunks.
    pub fn embedding_dim(&self) -> Option<usize> {
        self.embeddings.first().map(Vec::len)
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
}

/// A chunk selected by the ranker for a query. Derived, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub score: f32,
    pub chunk_id: usize,
}

/// The answer contract returned for every question.
///
/// Serialized with a `mode` discriminant: `"qa"` or `"visualization"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StructuredAnswer {
    Qa {
        answer: String,
        #[serde(default)]
        sources: Vec<Source>,
    },
    Visualization {
        answer: String,
        chart_config: ChartConfig,
    },
}

impl StructuredAnswer {
    /// A plain Q&A answer with no sources.
    pub fn qa(answer: impl Into<String>) -> Self {
        StructuredAnswer::Qa {
            answer: answer.into(),
            sources: Vec::new(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            StructuredAnswer::Qa { .. } => "qa",
            StructuredAnswer::Visualization { .. } => "visualization",
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            StructuredAnswer::Qa { answer, .. } | StructuredAnswer::Visualization { answer, .. } => {
                answer
            }
        }
    }
}

/// A supporting excerpt cited by a Q&A answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub snippet: String,
}

/// A Chart.js-style chart definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub data: ChartData,
    #[serde(default = "empty_object")]
    pub options: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Doughnut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// One data series. Styling keys (`backgroundColor`, `borderColor`, …)
/// are carried through untouched in `style`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub label: String,
    pub data: Vec<f64>,
    #[serde(flatten)]
    pub style: Map<String, Value>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
