//! Debug HTTP surface, compiled only with the `debug_http` feature.
//!
//! A lightweight Axum server exposing the downstream read interface
//! (latest classification, cognitive state) and the recording control
//! pair. The production HTTP surface lives outside this crate; this one
//! exists for local development against the mock headband.

use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::analysis::ClassificationEvent;
use crate::engine::{CognitiveState, EngineHandle};
use crate::error::ErrorCode;

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    NoPrediction,
    Recording(crate::error::RecordingError),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NoPrediction => (StatusCode::NOT_FOUND, "No prediction yet".to_string()),
            Self::Recording(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("recording error {}: {}", err.code(), err.message()),
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health endpoint payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub recording: bool,
}

/// Recording control acknowledgement.
#[derive(Debug, Serialize)]
pub struct RecordingAck {
    pub recording: bool,
}

/// Build the Axum router with all handlers.
pub fn build_router(handle: EngineHandle) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/latest", get(latest_prediction))
        .route("/api/state", get(cognitive_state))
        .route("/api/recording/start", post(start_recording))
        .route("/api/recording/stop", post(stop_recording))
        .with_state(handle)
}

/// Run the HTTP server loop.
pub async fn run_http_server(handle: EngineHandle, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding debug HTTP listener")?;
    log::info!("[Http] debug server listening on {}", addr);
    axum::serve(listener, build_router(handle))
        .await
        .context("serving debug HTTP router")?;
    Ok(())
}

async fn health(State(handle): State<EngineHandle>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        recording: handle.is_recording(),
    })
}

async fn latest_prediction(
    State(handle): State<EngineHandle>,
) -> Result<Json<ClassificationEvent>, HttpServerError> {
    handle
        .latest_classification()
        .map(Json)
        .ok_or(HttpServerError::NoPrediction)
}

async fn cognitive_state(State(handle): State<EngineHandle>) -> Json<CognitiveState> {
    Json(handle.cognitive_state())
}

async fn start_recording(
    State(handle): State<EngineHandle>,
) -> Result<Json<RecordingAck>, HttpServerError> {
    handle
        .start_recording()
        .map_err(HttpServerError::Recording)?;
    Ok(Json(RecordingAck { recording: true }))
}

async fn stop_recording(
    State(handle): State<EngineHandle>,
) -> Result<Json<RecordingAck>, HttpServerError> {
    handle.stop_recording().map_err(HttpServerError::Recording)?;
    Ok(Json(RecordingAck { recording: false }))
}
