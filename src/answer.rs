//! Grounded answer composition.
//!
//! Turns retrieved chunks and a question into a single prompt, calls the
//! [`Generator`], and recovers a [`StructuredAnswer`] from whatever text
//! comes back. Recovery is a two-stage pure pipeline:
//!
//! 1. [`sanitize`]: drop markdown code fences and keep only the span from
//!    the first `{` to the last `}`.
//! 2. [`parse_answer`]: parse that span, check the `mode` discriminant,
//!    and fall back to a `qa` answer quoting the raw output when anything
//!    is off.
//!
//! Composition never fails: a caller always gets a well-formed answer,
//! possibly a degraded one.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::generation::Generator;
use crate::models::{RetrievedChunk, Source, StructuredAnswer};

/// Answer returned when retrieval finds nothing; no model call is made.
pub const NO_RELEVANT_INFO: &str =
    "I could not find any relevant information in the document to answer that.";

/// Prefix of the fallback answer produced for unparseable model output.
pub const FORMAT_ERROR_PREFIX: &str = "Error formatting response. Raw: ";

/// How many characters of raw model output the fallback answer quotes.
pub const RAW_EXCERPT_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = r#"You are DocSage, an expert document assistant. Answer using ONLY the context below.

OUTPUT FORMAT: respond with a single valid JSON object and nothing else.

MODE 1: Q&A (default)
Format: { "mode": "qa", "answer": "Concise, human-friendly response.", "sources": [{"snippet": "short supporting quote"}] }
If the context looks like sample or placeholder data, say so.

MODE 2: VISUALIZATION
Use only when the user asks to plot, chart, graph, or visualize data.
Format: {
    "mode": "visualization",
    "answer": "Short explanation of the chart.",
    "chart_config": {
        "type": "bar" | "line" | "pie" | "doughnut",
        "data": { "labels": ["A", "B"], "datasets": [{ "label": "Data", "data": [10, 20] }] },
        "options": { "responsive": true }
    }
}
"#;

/// Builds prompts, calls the generator, and validates the result.
#[derive(Clone)]
pub struct AnswerComposer {
    generator: Arc<dyn Generator>,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Produce an answer for `question` grounded in `chunks`.
    pub async fn compose(&self, chunks: &[RetrievedChunk], question: &str) -> StructuredAnswer {
        if chunks.is_empty() {
            return StructuredAnswer::qa(NO_RELEVANT_INFO);
        }

        let prompt = build_prompt(chunks, question);
        tracing::debug!(
            model = self.generator.model_name(),
            chunks = chunks.len(),
            prompt_len = prompt.len(),
            "generating answer"
        );

        match self.generator.generate(&prompt).await {
            Ok(raw) => parse_answer(&raw),
            Err(e) => {
                tracing::error!(model = self.generator.model_name(), error = %e, "generation failed");
                StructuredAnswer::qa(format!(
                    "Error generating response: {}",
                    excerpt(&e.to_string())
                ))
            }
        }
    }
}

/// Assemble the grounding prompt: instructions, labeled chunks, question.
pub fn build_prompt(chunks: &[RetrievedChunk], question: &str) -> String {
    let context = chunks
        .iter()
        .map(|c| format!("[Chunk {}] {}", c.chunk_id, c.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\nCONTEXT:\n{}\n\nUSER QUESTION: {}\n\nJSON OUTPUT:",
        SYSTEM_PROMPT, context, question
    )
}

/// Strip code fences and anything outside the outermost `{ … }` span.
pub fn sanitize(raw: &str) -> String {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => cleaned[start..=end].to_string(),
        _ => cleaned.to_string(),
    }
}

/// Recover a [`StructuredAnswer`] from raw model output. Never fails.
///
/// - `qa` → answer plus any well-formed `sources` entries.
/// - `visualization` → full chart validation; an invalid chart is treated
///   like unparseable output.
/// - missing or unknown `mode` → `qa` built from the `answer` field.
///
/// `mode` is compared after trimming and lowercasing.
/// - anything unparseable, or no usable `answer` text → the fallback
///   answer quoting the first [`RAW_EXCERPT_CHARS`] characters of `raw`.
pub fn parse_answer(raw: &str) -> StructuredAnswer {
    let value: Value = match serde_json::from_str(&sanitize(raw)) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, raw, "model output is not valid JSON");
            return fallback_answer(raw);
        }
    };

    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            tracing::error!(raw, "model output is not a JSON object");
            return fallback_answer(raw);
        }
    };

    let mode = obj
        .get("mode")
        .and_then(|m| m.as_str())
        .map(|m| m.trim().to_ascii_lowercase());

    match mode.as_deref() {
        Some("visualization") => {
            // The tag is matched case-insensitively; serde only accepts lowercase.
            let mut normalized = obj.clone();
            normalized.insert("mode".to_string(), Value::from("visualization"));
            match serde_json::from_value::<StructuredAnswer>(Value::Object(normalized)) {
                Ok(answer @ StructuredAnswer::Visualization { .. }) => answer,
                Ok(_) | Err(_) => {
                    tracing::error!(raw, "invalid visualization answer");
                    fallback_answer(raw)
                }
            }
        }
        Some("qa") => qa_from_object(obj).unwrap_or_else(|| fallback_answer(raw)),
        other => {
            tracing::warn!(mode = ?other, "unrecognized answer mode, answering as qa");
            qa_from_object(obj).unwrap_or_else(|| fallback_answer(raw))
        }
    }
}

/// Build a `qa` answer from an object with a string `answer` field.
/// Source entries may be `{ "snippet": … }` objects or bare strings;
/// anything else is dropped.
fn qa_from_object(obj: &Map<String, Value>) -> Option<StructuredAnswer> {
    let answer = obj.get("answer")?.as_str()?.to_string();
    let sources = obj
        .get("sources")
        .and_then(|s| s.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let snippet = match item {
                        Value::String(s) => s.as_str(),
                        Value::Object(o) => o.get("snippet")?.as_str()?,
                        _ => return None,
                    };
                    Some(Source {
                        snippet: snippet.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(StructuredAnswer::Qa { answer, sources })
}

/// The degraded answer used when model output cannot be recovered.
pub fn fallback_answer(raw: &str) -> StructuredAnswer {
    StructuredAnswer::qa(format!("{}{}", FORMAT_ERROR_PREFIX, excerpt(raw)))
}

fn excerpt(text: &str) -> String {
    text.chars().take(RAW_EXCERPT_CHARS).collect()
}
