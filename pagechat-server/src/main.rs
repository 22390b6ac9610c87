//! pagechat API server.
//!
//! Wires the engine to its HTTP surface: loads configuration from the
//! environment (a `.env` file is honored), picks real or offline model
//! providers depending on whether an API key is present, and serves until
//! ctrl-c.

mod http;

use std::sync::Arc;
use std::time::Duration;

use pagechat::providers::{
    EchoGeneration, EmbeddingProvider, GenerationProvider, HashEmbeddings, OpenAiEmbeddings,
    OpenAiGeneration, openai,
};
use pagechat::{ChatEngine, EngineConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct ServerConfig {
    addr: String,
    api_base: String,
    api_key: Option<String>,
    embedding_model: String,
    chat_model: String,
    max_sessions: usize,
    request_timeout: Duration,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            addr: env_or("PAGECHAT_ADDR", "127.0.0.1:8000"),
            api_base: env_or("PAGECHAT_API_BASE", openai::DEFAULT_API_BASE),
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            embedding_model: env_or("PAGECHAT_EMBEDDING_MODEL", "text-embedding-3-small"),
            chat_model: env_or("PAGECHAT_CHAT_MODEL", "gpt-4o-mini"),
            max_sessions: std::env::var("PAGECHAT_MAX_SESSIONS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(EngineConfig::default().max_sessions),
            request_timeout: Duration::from_secs(
                std::env::var("PAGECHAT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(20),
            ),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let client = reqwest::Client::builder()
        .user_agent(concat!("pagechat/", env!("CARGO_PKG_VERSION")))
        .timeout(config.request_timeout)
        .build()?;

    let (embeddings, generation): (Arc<dyn EmbeddingProvider>, Arc<dyn GenerationProvider>) =
        match &config.api_key {
            Some(key) => {
                info!(
                    api_base = %config.api_base,
                    embedding_model = %config.embedding_model,
                    chat_model = %config.chat_model,
                    "using OpenAI-compatible providers"
                );
                (
                    Arc::new(OpenAiEmbeddings::new(
                        client.clone(),
                        config.api_base.clone(),
                        key.clone(),
                        config.embedding_model.clone(),
                    )),
                    Arc::new(OpenAiGeneration::new(
                        client.clone(),
                        config.api_base.clone(),
                        key.clone(),
                        config.chat_model.clone(),
                    )),
                )
            }
            None => {
                warn!("OPENAI_API_KEY is not set; answers use offline fallback providers");
                (Arc::new(HashEmbeddings::default()), Arc::new(EchoGeneration))
            }
        };

    let engine_config = EngineConfig {
        max_sessions: config.max_sessions,
        ..EngineConfig::default()
    };
    let engine = Arc::new(ChatEngine::new(
        engine_config,
        client,
        embeddings,
        generation,
    ));

    let app = http::router(http::AppState { engine });
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!(addr = %listener.local_addr()?, "pagechat server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
