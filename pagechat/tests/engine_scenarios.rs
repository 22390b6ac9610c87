//! End-to-end engine scenarios against a mock page server.
//!
//! Pages are served by httpmock; embeddings and generation use the
//! deterministic offline providers, so every scenario runs without network
//! access or API keys.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use httpmock::prelude::*;
use pagechat::providers::{EchoGeneration, GenerationProvider, HashEmbeddings};
use pagechat::types::{FetchError, GenerationError, QueryError};
use pagechat::{ChatEngine, EngineConfig};

const ACME_HTML: &str = r#"<html><head><title>Acme Corp</title></head><body>
    <p>Acme Corp sells widgets. Contact: sales@acme.com.</p>
    <p>The weather report for Oslo promises heavy snow during winter evenings,
       and the forecast continues with freezing temperatures for the rest of
       the week, keeping residents indoors near their fireplaces.</p>
    <p>Local football results from the weekend filled the back pages, with the
       home team celebrating a narrow victory in front of a loud crowd.</p>
</body></html>"#;

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .expect("client")
}

fn engine() -> ChatEngine {
    engine_with(EngineConfig::default(), Arc::new(EchoGeneration))
}

fn engine_with(config: EngineConfig, generation: Arc<dyn GenerationProvider>) -> ChatEngine {
    ChatEngine::new(
        config,
        http_client(),
        Arc::new(HashEmbeddings::default()),
        generation,
    )
}

#[tokio::test]
async fn answers_are_grounded_in_the_fetched_page() {
    let server = MockServer::start_async().await;
    let page = server
        .mock_async(|when, then| {
            when.method(GET).path("/acme");
            then.status(200).body(ACME_HTML);
        })
        .await;

    let engine = engine();
    let url = server.url("/acme");
    let answer = engine.answer(&url, "What does Acme sell?").await.unwrap();

    page.assert_async().await;
    assert!(answer.contains("widgets"), "answer was: {answer}");

    let history = engine.history(&url).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "What does Acme sell?");
    assert_eq!(history[1].content, answer);
}

#[tokio::test]
async fn auth_walled_page_creates_no_session() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/private");
            then.status(401);
        })
        .await;

    let engine = engine();
    let err = engine
        .answer(&server.url("/private"), "What is here?")
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Fetch(FetchError::AuthRequired)));
    assert!(err.to_string().contains("authentication"));
    assert_eq!(engine.session_count().await, 0);
}

#[tokio::test]
async fn unreadable_page_creates_no_session() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/blank");
            then.status(200).body("<html><body>   </body></html>");
        })
        .await;

    let engine = engine();
    let err = engine
        .answer(&server.url("/blank"), "Anything?")
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Fetch(FetchError::Empty)));
    assert_eq!(engine.session_count().await, 0);
}

#[tokio::test]
async fn history_keeps_only_the_most_recent_twenty_turns() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/acme");
            then.status(200).body(ACME_HTML);
        })
        .await;

    let engine = engine();
    let url = server.url("/acme");
    for i in 0..11 {
        engine
            .answer(&url, &format!("Question number {i}?"))
            .await
            .unwrap();
    }

    let history = engine.history(&url).await;
    assert_eq!(history.len(), 20);
    // 22 turns were appended; the first exchange fell off.
    assert_eq!(history[0].content, "Question number 1?");
    assert_eq!(history[0].seq, 2);
}

#[tokio::test]
async fn reset_forces_a_fresh_fetch() {
    let server = MockServer::start_async().await;
    let page = server
        .mock_async(|when, then| {
            when.method(GET).path("/acme");
            then.status(200).body(ACME_HTML);
        })
        .await;

    let engine = engine();
    let url = server.url("/acme");

    engine.answer(&url, "What does Acme sell?").await.unwrap();
    engine.answer(&url, "Who do I contact?").await.unwrap();
    assert_eq!(page.hits_async().await, 1);

    assert!(engine.reset(&url).await);
    assert!(engine.history(&url).await.is_empty());

    engine.answer(&url, "What does Acme sell?").await.unwrap();
    assert_eq!(page.hits_async().await, 2);
}

#[tokio::test]
async fn concurrent_first_queries_build_the_index_once() {
    let server = MockServer::start_async().await;
    let page = server
        .mock_async(|when, then| {
            when.method(GET).path("/acme");
            then.status(200).body(ACME_HTML);
        })
        .await;

    let engine = Arc::new(engine());
    let url = server.url("/acme");

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let url = url.clone();
        tasks.push(tokio::spawn(async move {
            engine.answer(&url, "What does Acme sell?").await
        }));
    }
    let mut answers = Vec::new();
    for task in tasks {
        answers.push(task.await.unwrap().unwrap());
    }

    assert_eq!(page.hits_async().await, 1);
    assert!(answers.iter().all(|answer| answer == &answers[0]));
    assert_eq!(engine.session_count().await, 1);
    assert_eq!(engine.history(&url).await.len(), 16);
}

#[tokio::test]
async fn sessions_are_isolated_per_url() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/acme");
            then.status(200).body(ACME_HTML);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/other");
            then.status(200).body(
                "<html><body><p>This page is entirely about gardening tools, \
                 covering spades, trowels, pruning shears, and the long-running \
                 debate about the perfect watering can for small balconies.</p>\
                 </body></html>",
            );
        })
        .await;

    let engine = engine();
    let acme = server.url("/acme");
    let other = server.url("/other");

    let acme_answer = engine.answer(&acme, "What does Acme sell?").await.unwrap();
    let other_answer = engine
        .answer(&other, "What is this page about?")
        .await
        .unwrap();

    assert!(acme_answer.contains("widgets"));
    assert!(other_answer.contains("gardening"));
    assert_eq!(engine.history(&acme).await.len(), 2);
    assert_eq!(engine.history(&other).await.len(), 2);
    assert_ne!(
        engine.history(&acme).await[1].content,
        engine.history(&other).await[1].content
    );
}

#[tokio::test]
async fn url_query_strings_share_one_session() {
    let server = MockServer::start_async().await;
    let page = server
        .mock_async(|when, then| {
            when.method(GET).path("/acme");
            then.status(200).body(ACME_HTML);
        })
        .await;

    let engine = engine();
    engine
        .answer(&server.url("/acme?utm_source=mail"), "What does Acme sell?")
        .await
        .unwrap();
    engine
        .answer(&server.url("/acme?utm_source=chat"), "Who do I contact?")
        .await
        .unwrap();

    assert_eq!(page.hits_async().await, 1);
    assert_eq!(engine.session_count().await, 1);
}

/// Succeeds until flipped, then fails every call.
struct FlakyGeneration {
    inner: EchoGeneration,
    failing: AtomicBool,
}

#[async_trait]
impl GenerationProvider for FlakyGeneration {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GenerationError::ProviderUnavailable {
                reason: "injected outage".to_string(),
            });
        }
        self.inner.generate(prompt).await
    }
}

#[tokio::test]
async fn failed_generation_leaves_history_untouched() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/acme");
            then.status(200).body(ACME_HTML);
        })
        .await;

    let generation = Arc::new(FlakyGeneration {
        inner: EchoGeneration,
        failing: AtomicBool::new(false),
    });
    let engine = engine_with(EngineConfig::default(), generation.clone());
    let url = server.url("/acme");

    engine.answer(&url, "What does Acme sell?").await.unwrap();
    let before = engine.history(&url).await;
    assert_eq!(before.len(), 2);

    generation.failing.store(true, Ordering::SeqCst);
    let err = engine.answer(&url, "And who runs it?").await.unwrap_err();
    assert!(matches!(
        err,
        QueryError::Generation(GenerationError::ProviderUnavailable { .. })
    ));

    let after = engine.history(&url).await;
    assert_eq!(before, after);
    assert_eq!(engine.session_count().await, 1);
}

#[tokio::test]
async fn evicted_sessions_rebuild_on_return() {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET).path("/one");
            then.status(200).body(ACME_HTML);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/two");
            then.status(200).body(ACME_HTML);
        })
        .await;

    let config = EngineConfig {
        max_sessions: 1,
        ..EngineConfig::default()
    };
    let engine = engine_with(config, Arc::new(EchoGeneration));

    engine
        .answer(&server.url("/one"), "What does Acme sell?")
        .await
        .unwrap();
    engine
        .answer(&server.url("/two"), "What does Acme sell?")
        .await
        .unwrap();
    assert_eq!(engine.session_count().await, 1);

    engine
        .answer(&server.url("/one"), "What does Acme sell?")
        .await
        .unwrap();
    assert_eq!(first.hits_async().await, 2);
}

#[tokio::test]
async fn slow_pages_time_out_cleanly() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .body(ACME_HTML)
                .delay(Duration::from_secs(5));
        })
        .await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .expect("client");
    let engine = ChatEngine::new(
        EngineConfig::default(),
        client,
        Arc::new(HashEmbeddings::default()),
        Arc::new(EchoGeneration),
    );

    let err = engine
        .answer(&server.url("/slow"), "Anything?")
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Fetch(FetchError::Timeout)));
    assert_eq!(engine.session_count().await, 0);
}

#[tokio::test]
async fn validation_rejects_blank_and_non_http_input() {
    let engine = engine();

    let err = engine.answer("", "What is this?").await.unwrap_err();
    assert!(err.is_validation());

    let err = engine
        .answer("https://example.com", "   ")
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = engine
        .answer("ftp://example.com/file", "What is this?")
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = engine.answer("not a url", "What is this?").await.unwrap_err();
    assert!(err.is_validation());

    // Validation failures never touch the store.
    assert_eq!(engine.session_count().await, 0);
}

#[tokio::test]
async fn reset_of_unknown_url_is_a_quiet_no_op() {
    let engine = engine();
    assert!(!engine.reset("https://example.com/never-seen").await);
    assert!(!engine.reset("not a url").await);
}
