//! Per-session embedding index with exact cosine retrieval.
//!
//! The index is a plain in-memory structure: chunk records in source order
//! paired with unit-normalized vectors. Pages are small enough that exact
//! scoring stays fast while keeping ranking fully deterministic. Nothing is
//! persisted; the index lives and dies with its session.

use tracing::debug;

use crate::ingestion::Chunk;
use crate::providers::EmbeddingProvider;
use crate::types::EmbeddingError;

/// A retrieval hit: a chunk and its cosine similarity to the query.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Immutable similarity index over one page's chunks.
#[derive(Clone, Debug)]
pub struct ChunkIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    embedder: String,
}

impl ChunkIndex {
    /// Embeds every chunk (in provider batches of `batch_size`) and builds
    /// the index. Build-or-fail is atomic: on any provider error nothing is
    /// returned and the caller installs nothing.
    pub async fn build(
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self, EmbeddingError> {
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size.max(1)) {
            let embedded = provider.embed(batch).await?;
            if embedded.len() != batch.len() {
                return Err(EmbeddingError::ProviderUnavailable {
                    reason: format!(
                        "expected {} embeddings, received {}",
                        batch.len(),
                        embedded.len()
                    ),
                });
            }
            vectors.extend(embedded.into_iter().map(normalize));
        }
        debug!(
            chunks = chunks.len(),
            embedder = provider.id(),
            "built chunk index"
        );
        Ok(Self {
            chunks,
            vectors,
            embedder: provider.id().to_string(),
        })
    }

    /// Returns up to `k` chunks ranked by descending cosine similarity to
    /// `query_vector`; equal scores rank earlier-in-document first. An empty
    /// index yields an empty result, never an error.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Vec<ScoredChunk> {
        if self.chunks.is_empty() || k == 0 {
            return Vec::new();
        }
        let query = normalize(query_vector.to_vec());
        let mut ranked: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (dot(vector, &query), position))
            .collect();
        ranked.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(self.chunks[a.1].ordinal.cmp(&self.chunks[b.1].ordinal))
        });
        ranked.truncate(k);
        ranked
            .into_iter()
            .map(|(score, position)| ScoredChunk {
                chunk: self.chunks[position].clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Identifier of the embedding space this index was built in.
    pub fn embedder(&self) -> &str {
        &self.embedder
    }
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
