//! Ingestion and question-answering façade.
//!
//! [`Engine`] owns the wiring between the chunker, the embedder, the
//! [`DocumentStore`], the ranker, and the [`AnswerComposer`]. The HTTP
//! server and the CLI talk only to this type.
//!
//! ```text
//! ingest:  text ─▶ chunk ─▶ embed (document) ─▶ store.put
//! answer:  question ─▶ embed (query) ─▶ rank(store.get) ─▶ compose
//! ```
//!
//! Ingestion writes to the store only after chunking and embedding have
//! both succeeded, so a failed or cancelled ingest leaves no trace.

use std::sync::Arc;

use uuid::Uuid;

use crate::answer::AnswerComposer;
use crate::chunk::{chunk_text, validate_window};
use crate::config::Config;
use crate::embedding::{create_embedder, EmbedRole, FallbackEmbedder};
use crate::error::{DocSageError, Result};
use crate::generation::{create_generator, Generator};
use crate::models::{Document, IngestReport, RetrievedChunk, StructuredAnswer};
use crate::rank::rank;
use crate::store::DocumentStore;

/// Chunking and retrieval knobs, decoupled from the full [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub window: usize,
    pub overlap: usize,
    pub top_k: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Config::minimal())
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            window: config.chunking.window,
            overlap: config.chunking.overlap,
            top_k: config.retrieval.top_k,
        }
    }
}

/// The retrieval-augmented answering pipeline.
#[derive(Clone)]
pub struct Engine {
    settings: EngineSettings,
    store: Arc<DocumentStore>,
    embedder: FallbackEmbedder,
    composer: AnswerComposer,
}

impl Engine {
    /// Assemble an engine from explicit parts.
    ///
    /// Fails if the chunking window cannot advance (`overlap >= window`).
    pub fn new(
        settings: EngineSettings,
        store: Arc<DocumentStore>,
        embedder: FallbackEmbedder,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        validate_window(settings.window, settings.overlap)?;
        if settings.top_k == 0 {
            return Err(DocSageError::Config(
                "retrieval.top_k must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            settings,
            store,
            embedder,
            composer: AnswerComposer::new(generator),
        })
    }

    /// Build an engine with the backends named in `config`.
    pub fn from_config(config: &Config, store: Arc<DocumentStore>) -> anyhow::Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        Ok(Self::new(
            EngineSettings::from(config),
            store,
            embedder,
            generator,
        )?)
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Chunk, embed, and store `document_text` under a fresh id.
    pub async fn ingest(&self, document_text: &str) -> Result<IngestReport> {
        let id = Uuid::new_v4().to_string();
        self.ingest_with_id(&id, document_text).await
    }

    /// Like [`ingest`](Self::ingest) with a caller-chosen id. An existing
    /// document with the same id is replaced.
    pub async fn ingest_with_id(&self, id: &str, document_text: &str) -> Result<IngestReport> {
        if document_text.trim().is_empty() {
            return Err(DocSageError::NoExtractableText);
        }

        let chunks = chunk_text(document_text, self.settings.window, self.settings.overlap)?;
        if chunks.is_empty() {
            return Err(DocSageError::NoExtractableText);
        }
        tracing::info!(document.id = %id, chunk_count = chunks.len(), "processing document");

        let embeddings = self.embedder.embed(&chunks, EmbedRole::Document).await?;
        let chunk_count = chunks.len();
        let doc = Document::new(id, chunks, embeddings, document_text)
            .map_err(|e| DocSageError::Embedding {
                primary: e.to_string(),
                fallback: "not attempted".to_string(),
            })?;
        self.store.put(doc);

        tracing::info!(document.id = %id, chunk_count, "ingested document");
        Ok(IngestReport {
            document_id: id.to_string(),
            chunk_count,
        })
    }

    /// Resolve an optional id to a stored document id.
    ///
    /// `None` (or a blank id) falls back to the most recently ingested
    /// document.
    pub fn resolve_document_id(&self, document_id: Option<&str>) -> Result<String> {
        match document_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Ok(id.to_string()),
            None => self.store.most_recent_id().ok_or(DocSageError::NoDocuments),
        }
    }

    /// Rank the chunks of `document_id` against `question`.
    ///
    /// An ingested document without chunks yields an empty result; an
    /// unknown id is [`DocSageError::DocumentNotFound`]. A query vector whose
    /// length differs from the document's is
    /// [`DocSageError::DimensionMismatch`].
    pub async fn retrieve(
        &self,
        document_id: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let doc = self
            .store
            .get(document_id)
            .ok_or_else(|| DocSageError::DocumentNotFound(document_id.to_string()))?;

        if doc.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_query(question).await?;
        if let Some(dim) = doc.embedding_dim() {
            if dim != query_vec.len() {
                tracing::error!(
                    document.id = %document_id,
                    document_dim = dim,
                    query_dim = query_vec.len(),
                    "query and document embeddings are incomparable"
                );
                return Err(DocSageError::DimensionMismatch {
                    document: dim,
                    query: query_vec.len(),
                });
            }
        }
        let ranked = rank(&query_vec, &doc.embeddings, top_k);
        tracing::debug!(
            document.id = %document_id,
            hits = ranked.len(),
            best = ?ranked.first().map(|r| r.score),
            "retrieved chunks"
        );

        Ok(ranked
            .into_iter()
            .map(|r| RetrievedChunk {
                text: doc.chunks[r.index].clone(),
                score: r.score,
                chunk_id: r.index,
            })
            .collect())
    }

    /// Answer `question` from a document (or the most recent one).
    pub async fn answer(
        &self,
        document_id: Option<&str>,
        question: &str,
    ) -> Result<StructuredAnswer> {
        let id = self.resolve_document_id(document_id)?;
        let chunks = self.retrieve(&id, question, self.settings.top_k).await?;
        let answer = self.composer.compose(&chunks, question).await;
        tracing::info!(document.id = %id, mode = answer.mode(), "answered question");
        Ok(answer)
    }
}
