//! Sliding-window text chunker.
//!
//! Splits document text into overlapping windows of `window` characters,
//! advancing by `window - overlap` characters each step. When a window
//! would end mid-text, the chunker looks for a newline within
//! [`LINE_SEARCH_RADIUS`] characters of the tentative end and cuts there
//! instead, so chunks rarely sever a line.
//!
//! # Algorithm
//!
//! 1. Reject `window == 0` and `overlap >= window` (the stride would not advance).
//! 2. For each `start = 0, stride, 2·stride, …` below the text length:
//!    - tentative `end = start + window`;
//!    - if `end` is before the text end, take the first `\n` in
//!      `[end - 50, end + 50)` as the new end;
//!    - keep `text[start..end]` unless it is whitespace-only.
//!
//! Positions count Unicode scalar values, so multi-byte text is never split
//! inside a character. The newline search never starts before the next
//! window's start, which keeps consecutive chunks gap-free.
//!
//! # Example
//!
//! ```rust
//! use docsage::chunk::chunk_text;
//!
//! let chunks = chunk_text("Hello world.\nSecond line.", 1000, 200).unwrap();
//! assert_eq!(chunks.len(), 1);
//! ```

use crate::error::{DocSageError, Result};

/// Default window size in characters.
pub const DEFAULT_WINDOW: usize = 1000;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_OVERLAP: usize = 200;
/// How far around a tentative cut the chunker looks for a newline.
pub const LINE_SEARCH_RADIUS: usize = 50;

/// A chunk together with the character range it was cut from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Character offset of the first character (inclusive).
    pub start: usize,
    /// Character offset one past the last character (exclusive).
    pub end: usize,
    pub text: String,
}

/// Split `text` into overlapping chunks. See the module docs for the rules.
///
/// Returns an empty vector for empty or whitespace-only input; callers
/// treat that as "no extractable text".
pub fn chunk_text(text: &str, window: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(chunk_spans(text, window, overlap)?
        .into_iter()
        .map(|s| s.text)
        .collect())
}

/// Like [`chunk_text`], but also reports each chunk's character range.
pub fn chunk_spans(text: &str, window: usize, overlap: usize) -> Result<Vec<ChunkSpan>> {
    validate_window(window, overlap)?;
    let stride = window - overlap;

    // Byte offset of every char, plus the end of the string.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = offsets.len() - 1;
    let chars: Vec<char> = text.chars().collect();

    let mut spans = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + window).min(len);
        if end < len {
            let lo = end.saturating_sub(LINE_SEARCH_RADIUS).max(start + stride);
            let hi = (end + LINE_SEARCH_RADIUS).min(len);
            if let Some(pos) = (lo..hi).find(|&i| chars[i] == '\n') {
                end = pos;
            }
        }

        let piece = &text[offsets[start]..offsets[end]];
        if !piece.trim().is_empty() {
            spans.push(ChunkSpan {
                start,
                end,
                text: piece.to_string(),
            });
        }
        start += stride;
    }

    Ok(spans)
}

/// Reject window parameters that would loop forever.
pub fn validate_window(window: usize, overlap: usize) -> Result<()> {
    if window == 0 || overlap >= window {
        return Err(DocSageError::InvalidChunking { window, overlap });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 1000, 200).unwrap();
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_empty_and_whitespace_yield_nothing() {
        assert!(chunk_text("", 1000, 200).unwrap().is_empty());
        assert!(chunk_text("   \n\n\t  ", 1000, 200).unwrap().is_empty());
    }

    #[test]
    fn test_overlap_not_smaller_than_window_rejected() {
        assert!(matches!(
            chunk_text("abc", 100, 100),
            Err(DocSageError::InvalidChunking {
                window: 100,
                overlap: 100
            })
        ));
        assert!(chunk_text("abc", 100, 150).is_err());
        assert!(chunk_text("abc", 0, 0).is_err());
    }

    #[test]
    fn test_windows_overlap_without_newlines() {
        let text = "a".repeat(2500);
        let spans = chunk_spans(&text, 1000, 200).unwrap();
        let ranges: Vec<(usize, usize)> = spans.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(
            ranges,
            vec![(0, 1000), (800, 1800), (1600, 2500), (2400, 2500)]
        );
    }

    #[test]
    fn test_cuts_at_nearby_newline() {
        // Newline 10 chars before the tentative end of the first window.
        let mut text = "x".repeat(990);
        text.push('\n');
        text.push_str(&"y".repeat(600));
        let spans = chunk_spans(&text, 1000, 200).unwrap();
        assert_eq!(spans[0].end, 990);
        assert!(!spans[0].text.contains('\n'));
        assert!(spans[0].text.chars().all(|c| c == 'x'));
    }

    #[test]
    fn test_newline_search_extends_past_window() {
        let mut text = "x".repeat(1030);
        text.push('\n');
        text.push_str(&"y".repeat(600));
        let spans = chunk_spans(&text, 1000, 200).unwrap();
        assert_eq!(spans[0].end, 1030);
    }

    #[test]
    fn test_far_newline_ignored() {
        let mut text = "x".repeat(500);
        text.push('\n');
        text.push_str(&"y".repeat(1000));
        let spans = chunk_spans(&text, 1000, 200).unwrap();
        assert_eq!(spans[0].end, 1000);
    }

    #[test]
    fn test_multibyte_text_not_split_inside_char() {
        let text = "é".repeat(1500);
        let chunks = chunk_text(&text, 1000, 200).unwrap();
        assert_eq!(chunks[0].chars().count(), 1000);
        assert!(chunks.iter().all(|c| c.chars().all(|ch| ch == 'é')));
    }

    #[test]
    fn test_whitespace_window_skipped() {
        let mut text = "head".to_string();
        text.push_str(&" ".repeat(30));
        text.push_str("tail");
        // stride 10: windows starting inside the padding are blank.
        let chunks = chunk_text(&text, 12, 2).unwrap();
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
        assert!(chunks.first().unwrap().starts_with("head"));
        assert!(chunks.last().unwrap().ends_with("tail"));
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\nBeta\nGamma\n".repeat(200);
        let c1 = chunk_text(&text, 300, 60).unwrap();
        let c2 = chunk_text(&text, 300, 60).unwrap();
        assert_eq!(c1, c2);
    }
}
