//! Deterministic boundary-first text chunking.
//!
//! Pages are split into bounded, overlapping spans for embedding and
//! retrieval. Break points come from Unicode sentence segmentation (which
//! also breaks at newlines, so paragraph boundaries are covered); spans with
//! no usable break point inside the size budget fall back to fixed-size
//! windows. The same input always yields the same chunks.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// A contiguous span of source text, identified by its ordinal position.
///
/// `start..end` are byte offsets into the text the chunk was split from;
/// `text` is exactly that slice. Chunks are immutable once produced and
/// belong to a single session's index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based position within the source document.
    pub ordinal: usize,
    /// The chunk's text, whitespace-trimmed at both ends.
    pub text: String,
    /// Byte offset of the first byte of `text` in the source.
    pub start: usize,
    /// Byte offset one past the last byte of `text` in the source.
    pub end: usize,
}

/// Splits text into overlapping chunks of bounded byte length.
#[derive(Clone, Debug)]
pub struct TextChunker {
    max_chunk_len: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Creates a chunker with the given size budget and overlap, both in
    /// bytes. The overlap is clamped to half the budget so every chunk
    /// makes forward progress through the source.
    pub fn new(max_chunk_len: usize, chunk_overlap: usize) -> Self {
        let max_chunk_len = max_chunk_len.max(1);
        Self {
            max_chunk_len,
            chunk_overlap: chunk_overlap.min(max_chunk_len / 2),
        }
    }

    /// Splits `text` into ordered chunks.
    ///
    /// Returns an empty vector only for blank input. Every produced chunk is
    /// non-empty after trimming, at most `max_chunk_len` bytes (except when a
    /// single character exceeds the budget), and consecutive chunks share
    /// `chunk_overlap` bytes of trailing context.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let break_points = sentence_break_points(text);
        let len = text.len();
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut start = 0usize;
        let mut covered = 0usize;
        let mut last_end = 0usize;

        while covered < len {
            let mut window_end = floor_char_boundary(text, (start + self.max_chunk_len).min(len));
            if window_end <= start {
                window_end = ceil_char_boundary(text, start + 1);
            }

            // Prefer the furthest sentence/paragraph break inside the window;
            // fall back to the window edge when none advances coverage.
            let end = match furthest_break_at_most(&break_points, window_end) {
                Some(boundary) if boundary > covered => boundary,
                _ if window_end > covered => window_end,
                _ => ceil_char_boundary(text, covered + 1),
            };

            let slice = &text[start..end];
            let trimmed_start = start + (slice.len() - slice.trim_start().len());
            let trimmed_end = end - (slice.len() - slice.trim_end().len());
            // A window whose fresh content is all whitespace would repeat the
            // previous chunk's overlap; only spans that end past everything
            // already emitted become chunks.
            if trimmed_start < trimmed_end && trimmed_end > last_end {
                chunks.push(Chunk {
                    ordinal: chunks.len(),
                    text: text[trimmed_start..trimmed_end].to_string(),
                    start: trimmed_start,
                    end: trimmed_end,
                });
                last_end = trimmed_end;
            }

            covered = end;
            start = floor_char_boundary(text, covered.saturating_sub(self.chunk_overlap));
        }

        chunks
    }
}

/// Byte offsets at which a chunk may end: Unicode sentence boundaries, which
/// per UAX #29 include every newline, so paragraph ends are present too.
/// All returned offsets are char boundaries, in ascending order, ending with
/// `text.len()`.
fn sentence_break_points(text: &str) -> Vec<usize> {
    text.split_sentence_bound_indices()
        .map(|(offset, sentence)| offset + sentence.len())
        .collect()
}

fn furthest_break_at_most(break_points: &[usize], limit: usize) -> Option<usize> {
    let idx = break_points.partition_point(|&b| b <= limit);
    idx.checked_sub(1).map(|i| break_points[i])
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
