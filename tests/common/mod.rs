//! Shared harness: stub collaborators and a running Oratio server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;

use oratio::ability::Ability;
use oratio::app::App;
use oratio::config::OratioConfig;
use oratio::store::LibSqlAbilityStore;

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Serve `router` on a random local port and return the port.
pub async fn serve(router: Router) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;
    port
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ── Stub NLU ────────────────────────────────────────────────────────

/// Cerebro stand-in: answers each known text with a single scored intent and
/// unknown texts with no intent at all.
pub async fn spawn_cerebro(intents: &[(&str, &str)]) -> u16 {
    let table: Arc<HashMap<String, String>> = Arc::new(
        intents
            .iter()
            .map(|(text, intent)| (text.to_string(), intent.to_string()))
            .collect(),
    );
    let router = Router::new()
        .route("/understand", post(understand))
        .with_state(table);
    serve(router).await
}

async fn understand(
    State(table): State<Arc<HashMap<String, String>>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let text = body["text"].as_str().unwrap_or_default();
    let intents = match table.get(text) {
        Some(label) => serde_json::json!([{ "label": label, "score": 0.9 }]),
        None => serde_json::json!([]),
    };
    Json(serde_json::json!({ "text": text, "intents": intents, "entities": [] }))
}

// ── Stub NLG ────────────────────────────────────────────────────────

/// Anima stand-in: renders the NLG sentence verbatim.
pub async fn spawn_anima() -> u16 {
    let router = Router::new().route(
        "/restitute",
        post(|Json(nlg): Json<Value>| async move {
            nlg["sentence"].as_str().unwrap_or_default().to_string()
        }),
    );
    serve(router).await
}

// ── Stub ability ────────────────────────────────────────────────────

/// Ability backend stand-in that replies with a fixed status and body and
/// records every request it receives.
#[derive(Clone)]
pub struct StubAbility {
    pub port: u16,
    pub seen: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct StubReply {
    status: StatusCode,
    body: String,
    seen: Arc<Mutex<Vec<Value>>>,
}

impl StubAbility {
    pub async fn spawn(status: StatusCode, body: impl Into<String>) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reply = StubReply {
            status,
            body: body.into(),
            seen: Arc::clone(&seen),
        };
        let router = Router::new()
            .route("/resolve", post(resolve))
            .with_state(reply);
        let port = serve(router).await;
        Self { port, seen }
    }

    /// Replies 200 with `response` as JSON.
    pub async fn ok(response: Value) -> Self {
        Self::spawn(StatusCode::OK, response.to_string()).await
    }

    pub fn requests(&self) -> Vec<Value> {
        self.seen.lock().unwrap().clone()
    }

    pub fn ability(&self, name: &str, intents: &[&str]) -> Ability {
        Ability {
            name: name.into(),
            host: "127.0.0.1".into(),
            port: self.port,
            intents: intents.iter().map(|i| i.to_string()).collect(),
        }
    }
}

async fn resolve(
    State(reply): State<StubReply>,
    Json(body): Json<Value>,
) -> (StatusCode, [(&'static str, &'static str); 1], String) {
    reply.seen.lock().unwrap().push(body);
    (
        reply.status,
        [("content-type", "application/json")],
        reply.body.clone(),
    )
}

// ── Oratio ──────────────────────────────────────────────────────────

/// Config pointing at the given collaborators, with an in-memory store.
pub fn config(cerebro_port: u16, anima_port: u16, abilities: Vec<Ability>) -> OratioConfig {
    let mut config = OratioConfig::default();
    config.cerebro.host = "127.0.0.1".into();
    config.cerebro.port = cerebro_port;
    config.anima.host = "127.0.0.1".into();
    config.anima.port = anima_port;
    config.abilities.call_timeout = Duration::from_secs(2);
    config.abilities.list = abilities;
    config
}

/// Start Oratio on a random port, returning its base URL and the wired app.
pub async fn start_oratio(config: &OratioConfig) -> (String, App) {
    let store = LibSqlAbilityStore::new_memory().await.unwrap();
    let app = App::with_store(config, Arc::new(store)).unwrap();
    let port = serve(app.router()).await;
    (format!("http://127.0.0.1:{port}"), app)
}
