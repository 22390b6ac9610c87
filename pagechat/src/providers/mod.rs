//! Provider seams for the two external model services.
//!
//! The engine is polymorphic over `{embed}` and `{generate}` so concrete
//! backends can be swapped without touching orchestration:
//!
//! * [`EmbeddingProvider`] — batched text-to-vector embedding.
//! * [`GenerationProvider`] — prompt-to-answer generation.
//!
//! [`openai`] implements both against an OpenAI-compatible HTTP API;
//! [`offline`] provides deterministic, network-free implementations used in
//! tests and keyless development runs.

pub mod offline;
pub mod openai;

use async_trait::async_trait;

use crate::types::{EmbeddingError, GenerationError};

/// Converts texts into vectors suitable for cosine similarity.
///
/// Implementations must return exactly one vector per input, in input
/// order, and must embed queries and documents into the same space. The
/// engine builds an index and embeds queries through one provider instance,
/// so this holds as long as a single implementation is self-consistent.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier for the model/space, used in logs and index
    /// metadata.
    fn id(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Produces an answer for an assembled prompt.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

pub use offline::{EchoGeneration, HashEmbeddings};
pub use openai::{OpenAiEmbeddings, OpenAiGeneration};
