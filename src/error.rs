//! Error taxonomy for the ingestion and retrieval pipeline.
//!
//! Ingestion and retrieval failures propagate to the caller as
//! [`DocSageError`]. Generation-stage failures never appear here: the
//! answer composer converts them into a degraded but well-formed
//! [`StructuredAnswer`](crate::models::StructuredAnswer).

use thiserror::Error;

use crate::extract::ExtractError;

/// Errors surfaced by [`Engine`](crate::engine::Engine) operations.
#[derive(Debug, Error)]
pub enum DocSageError {
    /// The document produced no non-whitespace text, or chunking produced
    /// zero segments.
    #[error("No text could be extracted.")]
    NoExtractableText,

    /// Chunking parameters that would never advance through the text.
    #[error("invalid chunking: overlap ({overlap}) must be smaller than window ({window})")]
    InvalidChunking { window: usize, overlap: usize },

    /// Both the primary and the fallback embedding models failed.
    #[error("Embedding failed (primary: {primary}; fallback: {fallback})")]
    Embedding { primary: String, fallback: String },

    /// The query was embedded with a different dimensionality than the
    /// document, typically because primary and fallback models disagree.
    #[error("Embedding dimension mismatch: document vectors have {document} dimensions, query has {query}")]
    DimensionMismatch { document: usize, query: usize },

    /// The requested document identifier is not in the store.
    #[error("Document ID not found.")]
    DocumentNotFound(String),

    /// No explicit document id was given and nothing has been ingested yet.
    #[error("Please upload a document first!")]
    NoDocuments,

    /// The uploaded file could not be turned into text.
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    /// Configuration that failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, DocSageError>;
