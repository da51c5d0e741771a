//! HTTP API hosting the ingestion queue.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/queue` | Snapshot of the queue |
//! | `POST` | `/api/queue` | Enqueue `{ "owner": ..., "repo": ... }` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `POST /api/queue` answers `201 Created` with an [`AddResult`] when the job
//! is accepted and `400 Bad Request` with the rejection reason otherwise.

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use repowiki_core::IngestionJob;
use repowiki_ingest::{AddResult, IngestionQueue, QueueSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Clone)]
struct AppState {
    queue: Arc<IngestionQueue>,
}

/// Build the router around a shared queue.
pub fn router(queue: Arc<IngestionQueue>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/queue", get(handle_snapshot).post(handle_enqueue))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { queue })
}

/// Serve until the process is terminated.
pub async fn run_server(bind: &str, queue: Arc<IngestionQueue>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, router(queue)).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_snapshot(State(state): State<AppState>) -> Json<QueueSnapshot> {
    Json(state.queue.snapshot())
}

/// Body of `POST /api/queue`. Missing fields are reported as a 400, not a rejection by axum.
#[derive(Debug, Default, Deserialize)]
struct EnqueueRequest {
    #[serde(default)]
    owner: String,
    #[serde(default)]
    repo: String,
}

async fn handle_enqueue(
    State(state): State<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> (StatusCode, Json<AddResult>) {
    let owner = request.owner.trim();
    let repo = request.repo.trim();
    if owner.is_empty() || repo.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(AddResult::failure("Owner and repo are required")),
        );
    }

    let result = AddResult::from(state.queue.add(IngestionJob::new(owner, repo)).await);
    let status = if result.success {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(result))
}
