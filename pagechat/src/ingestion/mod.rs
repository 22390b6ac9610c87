//! Turning a URL into indexable chunks.
//!
//! * [`fetch`] — page retrieval and HTML-to-text extraction.
//! * [`chunker`] — deterministic, overlapping, bounded-size splitting.

pub mod chunker;
pub mod fetch;

pub use chunker::{Chunk, TextChunker};
pub use fetch::{PageFetcher, PageText};
