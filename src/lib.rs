//! # DocSage
//!
//! Retrieval-augmented question answering over a single uploaded document.
//!
//! A document is split into overlapping windows, each window is embedded,
//! and questions are answered by ranking windows by cosine similarity and
//! handing the best ones to a generative model. The model replies either
//! with a textual answer or with a chart configuration; malformed replies
//! degrade to a plain answer instead of failing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌───────────────┐
//! │ Extract  │──▶│ Chunk+Embed │──▶│ DocumentStore │
//! │ PDF/TXT  │   │             │   │  (in-memory)  │
//! └──────────┘   └─────────────┘   └───────┬───────┘
//!                                          │
//!                      question ──▶ Rank ──┤
//!                                          ▼
//!                                   ┌─────────────┐
//!                                   │  Composer   │──▶ qa | visualization
//!                                   └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`answer`] | Prompt construction, output sanitizing, answer parsing |
//! | [`chunk`] | Overlapping character windows with newline snapping |
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | Embedding providers and primary → fallback embedding |
//! | [`engine`] | Ingest / retrieve / answer façade |
//! | [`error`] | Pipeline error taxonomy |
//! | [`extract`] | Text extraction from uploads |
//! | [`generation`] | Text generation providers |
//! | [`http`] | Shared JSON-over-HTTP client with retries |
//! | [`models`] | Core data types |
//! | [`rank`] | Cosine similarity ranking |
//! | [`server`] | HTTP API |
//! | [`store`] | In-memory document store |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod generation;
pub mod http;
pub mod models;
pub mod rank;
pub mod server;
pub mod store;
