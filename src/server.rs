//! HTTP bridge for the browser chat widget
//!
//! - `GET /api/health` reports liveness
//! - `POST /api/chat` takes `{ "question": "..." }` and returns the wire response
//! - anything else is served from the optional static directory
//!
//! Every response carries permissive CORS headers so the widget can be hosted elsewhere.

use crate::chat::{Assistant, ChatRequest, INVALID_QUESTION};
use crate::error::{CoursebotError, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[derive(Serialize)]
struct RejectedRequest {
    error: &'static str,
    answer: &'static str,
    sources: usize,
}

/// Build the router over a shared assistant
pub fn build_router(assistant: Arc<Assistant>, static_dir: Option<PathBuf>) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/chat", post(chat_handler));

    if let Some(dir) = static_dir {
        tracing::info!("Serving static files from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .with_state(assistant)
        .layer(CorsLayer::permissive())
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Scrimba AI API is running",
    }))
}

async fn chat_handler(State(assistant): State<Arc<Assistant>>, body: Bytes) -> Response {
    // Malformed bodies are treated like a missing question
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_default();

    // Missing, non-string and empty questions are rejected here. Anything else, blank
    // strings included, goes to the assistant and comes back as a 200 response.
    let question = match request.question_text() {
        Some(q) if !q.is_empty() => q,
        _ => {
            tracing::debug!("Rejected chat request without a valid question");
            return (
                StatusCode::BAD_REQUEST,
                Json(RejectedRequest {
                    error: INVALID_QUESTION,
                    answer: "Please provide a valid question.",
                    sources: 0,
                }),
            )
                .into_response();
        }
    };

    tracing::info!("API request: {:?}", question);
    let response = assistant.ask(question).await;
    tracing::info!("API response: {} sources", response.sources());

    Json(response.to_wire()).into_response()
}

/// Serve on an already-bound listener until `shutdown` resolves
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CoursebotError::Server(e.to_string()))
}

/// Bind `bind` and serve until Ctrl-C
pub async fn serve(
    assistant: Arc<Assistant>,
    bind: &str,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| CoursebotError::Io {
            source: e,
            context: format!("Failed to bind {}", bind),
        })?;

    tracing::info!("Chat API listening on http://{}", bind);

    serve_with_shutdown(listener, build_router(assistant, static_dir), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutting down chat API");
    })
    .await
}
