//! Providers backed by an OpenAI-compatible HTTP API.
//!
//! Both providers share the engine's `reqwest::Client`, which carries the
//! mandatory request timeout. Rate-limit responses (429) map to the
//! dedicated error variants; every other failure collapses into
//! `ProviderUnavailable` with a reason the API caller can read.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{EmbeddingProvider, GenerationProvider};
use crate::types::{EmbeddingError, GenerationError};

/// Default API base when none is configured.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Embeddings via `POST {base}/embeddings`.
#[derive(Clone)]
pub struct OpenAiEmbeddings {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: trim_base(api_base.into()),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), model = %self.model, "requesting embeddings");

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(embedding_transport)?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(EmbeddingError::RateLimited),
            status if !status.is_success() => {
                return Err(EmbeddingError::ProviderUnavailable {
                    reason: format!("HTTP {status}"),
                });
            }
            _ => {}
        }

        let mut parsed: EmbeddingsResponse =
            response.json().await.map_err(embedding_transport)?;
        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::ProviderUnavailable {
                reason: format!(
                    "expected {} embeddings, received {}",
                    texts.len(),
                    parsed.data.len()
                ),
            });
        }
        parsed.data.sort_by_key(|row| row.index);
        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }
}

fn embedding_transport(err: reqwest::Error) -> EmbeddingError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.without_url().to_string()
    };
    EmbeddingError::ProviderUnavailable { reason }
}

/// Generation via `POST {base}/chat/completions`, temperature 0.
#[derive(Clone)]
pub struct OpenAiGeneration {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiGeneration {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: trim_base(api_base.into()),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl GenerationProvider for OpenAiGeneration {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(model = %self.model, prompt_bytes = prompt.len(), "requesting completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": 0,
            }))
            .send()
            .await
            .map_err(generation_transport)?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(GenerationError::RateLimited),
            status if !status.is_success() => {
                return Err(GenerationError::ProviderUnavailable {
                    reason: format!("HTTP {status}"),
                });
            }
            _ => {}
        }

        let parsed: ChatResponse = response.json().await.map_err(generation_transport)?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(GenerationError::ProviderUnavailable {
                reason: "provider returned an empty completion".to_string(),
            });
        }
        Ok(answer)
    }
}

fn generation_transport(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::ProviderUnavailable {
            reason: err.without_url().to_string(),
        }
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}
