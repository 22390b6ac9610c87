//! The JSON wire contract consumed by the extension client.
//!
//! Domain failures (fetch/embedding/generation) come back as
//! `200 { "error": ... }`; the client renders either field, and non-2xx is
//! reserved for transport-level faults. Only malformed requests (missing or
//! blank fields, unparsable URLs) produce a 4xx.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pagechat::ChatEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub url: String,
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
struct AnswerBody {
    answer: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/reset", post(reset))
        .route("/health", get(health))
        .with_state(state)
}

async fn query(State(state): State<AppState>, Json(req): Json<QueryRequest>) -> Response {
    match state.engine.answer(&req.url, &req.query).await {
        Ok(answer) => (StatusCode::OK, Json(AnswerBody { answer })).into_response(),
        Err(err) if err.is_validation() => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: err.to_string(),
            }),
        )
            .into_response(),
        Err(err) => (
            StatusCode::OK,
            Json(ErrorBody {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

async fn reset(State(state): State<AppState>, Json(req): Json<ResetRequest>) -> Response {
    let existed = state.engine.reset(&req.url).await;
    debug!(url = %req.url, existed, "reset requested");
    (StatusCode::OK, Json(StatusBody { status: "reset" })).into_response()
}

async fn health() -> Response {
    (StatusCode::OK, Json(StatusBody { status: "ok" })).into_response()
}
