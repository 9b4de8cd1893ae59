//! HTTP surface: talk endpoint, ability administration and health probe.

pub mod abilities;
pub mod talk;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::conversation::TextOrchestrator;
use crate::registry::AbilityRegistry;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TextOrchestrator>,
    pub registry: Arc<AbilityRegistry>,
}

/// Build the full router with request tracing and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(talk::talk_routes())
        .merge(abilities::ability_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "oratio"
    }))
}

/// `{"error": message}` with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}
