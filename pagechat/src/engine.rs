//! The answer orchestrator.
//!
//! `ChatEngine::answer` runs one query through a fixed state machine:
//! validate, obtain the session (building its index on first contact),
//! retrieve grounding chunks, generate, then commit the exchange to
//! conversation memory. Any failure short-circuits without mutating the
//! session, so a failed query leaves prior state exactly as it was.

use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::EngineConfig;
use crate::index::ChunkIndex;
use crate::ingestion::{PageFetcher, TextChunker};
use crate::prompt;
use crate::providers::{EmbeddingProvider, GenerationProvider};
use crate::session::{IndexState, Role, Session, SessionKey, SessionStore, Turn};
use crate::types::{EmbeddingError, FetchError, QueryError};

/// Retrieval-augmented conversational engine over web pages.
///
/// One engine serves every session; it owns the session store, the shared
/// HTTP client, and exactly one embedding provider, so every index and every
/// query embedding live in the same vector space.
pub struct ChatEngine {
    config: EngineConfig,
    fetcher: PageFetcher,
    chunker: TextChunker,
    embeddings: Arc<dyn EmbeddingProvider>,
    generation: Arc<dyn GenerationProvider>,
    store: SessionStore,
}

impl ChatEngine {
    /// `client` must carry a request timeout; it is reused for page fetches
    /// (and typically shared with HTTP-backed providers).
    pub fn new(
        config: EngineConfig,
        client: Client,
        embeddings: Arc<dyn EmbeddingProvider>,
        generation: Arc<dyn GenerationProvider>,
    ) -> Self {
        let fetcher = PageFetcher::new(client, config.min_page_len);
        let chunker = TextChunker::new(config.max_chunk_len, config.chunk_overlap);
        let store = SessionStore::new(config.max_sessions, config.history_cap);
        Self {
            config,
            fetcher,
            chunker,
            embeddings,
            generation,
            store,
        }
    }

    /// Answers `query` about the page at `url`, grounded in that page's
    /// content and the session's conversation so far.
    pub async fn answer(&self, url: &str, query: &str) -> Result<String, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::Validation("query must not be empty".into()));
        }
        let url = url.trim();
        if url.is_empty() {
            return Err(QueryError::Validation("url must not be empty".into()));
        }
        let page_url = Url::parse(url)
            .map_err(|err| QueryError::Validation(format!("invalid url: {err}")))?;
        if !matches!(page_url.scheme(), "http" | "https") {
            return Err(QueryError::Validation(
                "only http and https pages are supported".into(),
            ));
        }
        let key = SessionKey::from_url(&page_url);

        let (session, _created) = self.store.get_or_create(&key).await;
        if let Err(err) = self.ensure_index(&session, &page_url).await {
            // Never leave an empty shell behind after a failed first build.
            self.store.discard_if_unbuilt(&key).await;
            return Err(err);
        }

        let query_vectors = self.embeddings.embed(&[query.to_string()]).await?;
        let query_vector =
            query_vectors
                .into_iter()
                .next()
                .ok_or(EmbeddingError::ProviderUnavailable {
                    reason: "no query embedding returned".to_string(),
                })?;

        let (hits, history, title) = {
            let data = session.read().await;
            let hits = match &data.index {
                IndexState::Ready(index) => index.search(&query_vector, self.config.top_k),
                _ => Vec::new(),
            };
            (hits, data.history.snapshot(), data.title.clone())
        };
        debug!(
            session = %session.id(),
            hits = hits.len(),
            history = history.len(),
            "retrieved context"
        );

        let page_label = title.unwrap_or_else(|| key.to_string());
        let prompt = prompt::build_prompt(&page_label, &hits, &history, query);
        let answer = self.generation.generate(&prompt).await?;

        {
            let mut data = session.write().await;
            data.history.push(Role::User, query);
            data.history.push(Role::Assistant, answer.clone());
        }
        info!(session = %session.id(), key = %key, "answered query");
        Ok(answer)
    }

    /// Discards the session for `url`, if any. Idempotent; a later query
    /// rebuilds from a fresh fetch. Unparsable URLs cannot name a session,
    /// so they are a no-op rather than an error.
    pub async fn reset(&self, url: &str) -> bool {
        match Url::parse(url.trim()) {
            Ok(page_url) => self.store.reset(&SessionKey::from_url(&page_url)).await,
            Err(_) => false,
        }
    }

    /// Number of live sessions, for diagnostics.
    pub async fn session_count(&self) -> usize {
        self.store.len().await
    }

    /// The retained conversation for `url`'s session, most recent last.
    /// Empty when no session exists.
    pub async fn history(&self, url: &str) -> Vec<Turn> {
        let Ok(page_url) = Url::parse(url.trim()) else {
            return Vec::new();
        };
        match self.store.get(&SessionKey::from_url(&page_url)).await {
            Some(session) => session.read().await.history.snapshot(),
            None => Vec::new(),
        }
    }

    /// Makes the session's index ready, building it on first contact.
    ///
    /// The write lock is held across the whole build, which is the
    /// single-flight guarantee: under a burst of first-queries exactly one
    /// caller fetches and embeds; the rest block here, then observe `Ready`.
    async fn ensure_index(&self, session: &Session, page_url: &Url) -> Result<(), QueryError> {
        {
            let data = session.read().await;
            if data.index.is_ready() {
                return Ok(());
            }
        }

        let mut data = session.write().await;
        if data.index.is_ready() {
            return Ok(());
        }
        data.index = IndexState::Building;

        match self.build_index(page_url).await {
            Ok((index, title)) => {
                info!(
                    session = %session.id(),
                    chunks = index.len(),
                    embedder = index.embedder(),
                    "session index ready"
                );
                data.index = IndexState::Ready(index);
                data.title = title;
                Ok(())
            }
            Err(err) => {
                warn!(session = %session.id(), url = %page_url, error = %err, "index build failed");
                data.index = IndexState::Absent;
                Err(err)
            }
        }
    }

    /// Fetch, chunk, and embed, producing the index and page title. Atomic:
    /// nothing is installed unless every step succeeds.
    async fn build_index(
        &self,
        page_url: &Url,
    ) -> Result<(ChunkIndex, Option<String>), QueryError> {
        let page = self.fetcher.fetch(page_url).await?;
        let chunks = self.chunker.split(&page.text);
        if chunks.is_empty() {
            return Err(FetchError::Empty.into());
        }
        debug!(url = %page_url, chunks = chunks.len(), "chunked page");
        let index = ChunkIndex::build(
            chunks,
            self.embeddings.as_ref(),
            self.config.embed_batch_size,
        )
        .await?;
        Ok((index, page.title))
    }
}
