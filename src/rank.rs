//! Cosine-similarity ranking of chunk vectors against a query vector.
//!
//! Results are sorted by score (desc), then chunk index (asc), so equal
//! scores always come back in document order. `top_k` is clamped to the
//! number of vectors; an empty vector set yields an empty ranking.

use serde::Serialize;

/// A ranked chunk position and its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ranked {
    pub index: usize,
    pub score: f32,
}

/// Rank `vectors` by cosine similarity to `query`, keeping the best `top_k`.
pub fn rank(query: &[f32], vectors: &[Vec<f32>], top_k: usize) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = vectors
        .iter()
        .enumerate()
        .map(|(index, v)| Ranked {
            index,
            score: cosine_similarity(query, v),
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
    ranked.truncate(top_k.min(vectors.len()));
    ranked
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths,
/// zero-norm vectors, and non-finite results (NaN or infinite components).
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom.is_nan() || denom < f32::EPSILON {
        return 0.0;
    }

    let sim = dot / denom;
    if sim.is_finite() {
        sim
    } else {
        0.0
    }
}
