//! Retrieval-augmented conversational engine for web pages.
//!
//! ```text
//! URL ──► ingestion::fetch ──► ingestion::chunker ──► index::ChunkIndex
//!                                                          │
//! Query ──► providers::EmbeddingProvider ──► index search ─┤
//!                                                          ▼
//! session::SessionStore ──► engine::ChatEngine ──► providers::GenerationProvider
//!        (per-URL index + conversation memory)         (grounded answer)
//! ```
//!
//! [`ChatEngine`] is the entry point: give it a configuration, an HTTP
//! client, and one provider for each of `{embed, generate}`, then call
//! [`ChatEngine::answer`] and [`ChatEngine::reset`]. Sessions are keyed by
//! normalized URL, built lazily on first query, bounded by LRU eviction,
//! and isolated from one another.

pub mod config;
pub mod engine;
pub mod index;
pub mod ingestion;
mod prompt;
pub mod providers;
pub mod session;
pub mod types;

pub use config::EngineConfig;
pub use engine::ChatEngine;
pub use index::{ChunkIndex, ScoredChunk};
pub use ingestion::{Chunk, PageFetcher, PageText, TextChunker};
pub use providers::{EmbeddingProvider, GenerationProvider};
pub use session::{Role, SessionKey, SessionStore, Turn};
pub use types::{EmbeddingError, FetchError, GenerationError, QueryError};
