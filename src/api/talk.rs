use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use super::{AppState, error_response};
use crate::conversation::TextRequest;

pub fn talk_routes() -> Router<AppState> {
    Router::new().route("/api/v1/talk/text", post(talk_text))
}

/// POST /api/v1/talk/text
///
/// Always 200 once the body parses: dispatch and generation failures are
/// rendered as sentences.
async fn talk_text(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let response = state.orchestrator.handle_text(request).await;
    Json(response).into_response()
}
