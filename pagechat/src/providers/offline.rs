//! Deterministic, network-free providers.
//!
//! These stand in for the real model services in tests and in keyless
//! development runs. [`HashEmbeddings`] projects token hashes into a fixed
//! number of buckets, which is crude but preserves the property retrieval
//! relies on: texts sharing words land near each other, and identical input
//! always embeds identically. [`EchoGeneration`] answers with the most
//! relevant retrieved excerpt instead of calling a model.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rustc_hash::FxHasher;
use unicode_segmentation::UnicodeSegmentation;

use super::{EmbeddingProvider, GenerationProvider};
use crate::prompt;
use crate::types::{EmbeddingError, GenerationError};

/// Hash-bucket embeddings over lowercased words.
#[derive(Clone, Debug)]
pub struct HashEmbeddings {
    dims: usize,
}

impl HashEmbeddings {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(8) }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dims];
        for word in text.unicode_words() {
            let word = word.to_lowercase();
            let mut hasher = FxHasher::default();
            word.hash(&mut hasher);
            let digest = hasher.finish();
            let bucket = (digest % self.dims as u64) as usize;
            let sign = if digest & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbeddings {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddings {
    fn id(&self) -> &str {
        "hash-embeddings"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }
}

/// Answers with the top retrieved excerpt rather than calling a model.
#[derive(Clone, Debug, Default)]
pub struct EchoGeneration;

#[async_trait]
impl GenerationProvider for EchoGeneration {
    async fn generate(&self, prompt_text: &str) -> Result<String, GenerationError> {
        let context = prompt::context_section(prompt_text);
        let answer = match context.and_then(|section| {
            section
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && *line != prompt::NO_CONTEXT)
                .map(str::to_string)
        }) {
            Some(excerpt) => format!("From the page: {}", truncate(&excerpt, 300)),
            None => "I do not have enough information on this page to answer that.".to_string(),
        };
        Ok(answer)
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
