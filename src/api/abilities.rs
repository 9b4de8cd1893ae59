//! Ability administration: introspect the registry tiers, upsert records.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use super::{AppState, error_response};
use crate::ability::{Ability, AbilitySource};
use crate::error::DatabaseError;

pub fn ability_routes() -> Router<AppState> {
    Router::new().route("/api/v1/abilities", get(list_abilities).post(create_or_update_ability))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub from: Option<String>,
}

/// GET /api/v1/abilities[?from=cache|database|config]
///
/// A missing or unknown `from` returns every tier.
async fn list_abilities(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    let source = params.from.as_deref().and_then(|f| f.parse::<AbilitySource>().ok());
    let registry = &state.registry;

    match source {
        Some(AbilitySource::Cache) => Json(registry.list_cache()).into_response(),
        Some(AbilitySource::Config) => Json(registry.list_config()).into_response(),
        Some(AbilitySource::Database) => match registry.list_database().await {
            Ok(abilities) => Json(abilities).into_response(),
            Err(e) => {
                error!(from = "database", error = %e, "Listing abilities failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        },
        None => match registry.list_all().await {
            Ok(all) => Json(all).into_response(),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
    }
}

/// POST /api/v1/abilities
async fn create_or_update_ability(
    State(state): State<AppState>,
    body: Result<Json<Ability>, JsonRejection>,
) -> Response {
    let Json(ability) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    if ability.name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Ability name must not be empty");
    }

    match state.registry.create_or_update(&ability).await {
        Ok(stored) => {
            info!(ability = %stored.name, intents = ?stored.intents, "Ability registered");
            (StatusCode::OK, Json(stored)).into_response()
        }
        Err(e @ DatabaseError::Constraint(_)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            error!(ability = %ability.name, error = %e, "Failed to upsert ability");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
