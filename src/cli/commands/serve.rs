//! HTTP API server.
//!
//! Exposes the three pipeline stages as JSON endpoints.

use crate::backend::Credential;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::error::TldwError;
use crate::orchestrator::Orchestrator;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use uuid::Uuid;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(preflight::Operation::Serve, &settings) {
        Output::warning(&format!("Pre-flight check failed: {}", e));
        Output::info("Some endpoints will fail until this is fixed. Run `tldw doctor` for details.");
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let orchestrator = Orchestrator::new(settings)?;

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("tldw API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ingest", "POST /api/video");
    Output::kv("Transcribe", "POST /api/transcribe");
    Output::kv("Summarize", "POST /api/summarize");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(orchestrator)).await?;

    Ok(())
}

/// Build the API router around an orchestrator.
pub fn router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/video", post(ingest))
        .route("/api/transcribe", post(transcribe))
        .route("/api/summarize", post(summarize))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoRequest {
    /// Video URL
    video: String,
    #[serde(default)]
    token: String,
    user_id: String,
    #[serde(default)]
    user_email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    message: &'static str,
    job_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageRequest {
    video_id: String,
    #[serde(default)]
    token: String,
}

#[derive(Serialize)]
struct TranscribeResponse {
    message: &'static str,
    transcript: String,
}

#[derive(Serialize)]
struct SummarizeResponse {
    message: &'static str,
    summary: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn status_for(error: &TldwError) -> StatusCode {
    match error {
        TldwError::TranscriptMissing(_) | TldwError::ObjectNotFound(_) => StatusCode::NOT_FOUND,
        TldwError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: TldwError) -> axum::response::Response {
    warn!("Request failed: {}", error);
    (
        status_for(&error),
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn index() -> &'static str {
    "Hello from tldw!"
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ingest(State(state): State<Arc<AppState>>, Json(req): Json<VideoRequest>) -> impl IntoResponse {
    // The task handle is dropped; the pipeline keeps running in the background.
    let ack = state.orchestrator.ingest(
        &req.video,
        Credential::new(req.token),
        &req.user_id,
        &req.user_email,
    );

    Json(VideoResponse {
        message: ack.message,
        job_id: ack.job_id,
    })
}

async fn transcribe(State(state): State<Arc<AppState>>, Json(req): Json<StageRequest>) -> impl IntoResponse {
    match state
        .orchestrator
        .transcribe(&req.video_id, &Credential::new(req.token))
        .await
    {
        Ok(outcome) => Json(TranscribeResponse {
            message: "done",
            transcript: outcome.transcript,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn summarize(State(state): State<Arc<AppState>>, Json(req): Json<StageRequest>) -> impl IntoResponse {
    match state
        .orchestrator
        .summarize(&req.video_id, &Credential::new(req.token))
        .await
    {
        Ok(outcome) => Json(SummarizeResponse {
            message: outcome.status.message(),
            summary: outcome.summary,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
