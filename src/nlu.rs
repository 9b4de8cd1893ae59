//! NLU collaborator (Cerebro): turns raw text into scored intents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::nlg::normalize_endpoint;

const SERVICE: &str = "cerebro";

/// Intent reported when the NLU service cannot be reached or answers garbage.
pub const ERROR_INTENT: &str = "error";

/// Result of natural language understanding for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nlu {
    #[serde(default, alias = "BestIntent")]
    pub best_intent: String,
    #[serde(default, alias = "Intents", deserialize_with = "crate::nlg::null_as_default")]
    pub intents: Vec<Intent>,
    #[serde(default, alias = "Entities", deserialize_with = "crate::nlg::null_as_default")]
    pub entities: Vec<Entity>,
    #[serde(default, alias = "Text", skip_serializing_if = "String::is_empty")]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default, alias = "Label")]
    pub label: String,
    #[serde(default, alias = "Score")]
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, alias = "Label")]
    pub label: String,
    #[serde(default, alias = "Text")]
    pub text: String,
}

impl Nlu {
    /// The sentinel result used when understanding failed.
    pub fn error() -> Self {
        Self {
            best_intent: ERROR_INTENT.to_string(),
            ..Default::default()
        }
    }

    /// Point `best_intent` at the highest scoring intent, if any scored above zero.
    pub fn elect_best_intent(&mut self) {
        let mut best_score = 0.0_f32;
        for intent in &self.intents {
            if intent.score > best_score {
                self.best_intent = intent.label.clone();
                best_score = intent.score;
            }
        }
    }
}

/// Produces an [`Nlu`] for a piece of text. Never fails: errors map to [`Nlu::error`].
#[async_trait]
pub trait Understander: Send + Sync {
    async fn understand(&self, text: &str) -> Nlu;
}

/// HTTP client for the Cerebro understanding endpoint.
pub struct CerebroClient {
    client: reqwest::Client,
    url: String,
}

impl CerebroClient {
    pub fn new(client: reqwest::Client, host: &str, port: u16, understand_endpoint: &str) -> Self {
        Self {
            client,
            url: format!("http://{host}:{port}{}", normalize_endpoint(understand_endpoint)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, text: &str) -> Result<Nlu, CollaboratorError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| CollaboratorError::RequestFailed {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        tracing::info!(client = SERVICE, status = status.as_u16(), url = %self.url, "POST");
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                service: SERVICE.into(),
                status: status.as_u16(),
            });
        }

        resp.json::<Nlu>()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse {
                service: SERVICE.into(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Understander for CerebroClient {
    async fn understand(&self, text: &str) -> Nlu {
        match self.request(text).await {
            Ok(mut nlu) => {
                nlu.elect_best_intent();
                tracing::debug!(client = SERVICE, best_intent = %nlu.best_intent, "Understood text");
                nlu
            }
            Err(e) => {
                tracing::error!(client = SERVICE, error = %e, "Understanding failed");
                Nlu::error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(label: &str, score: f32) -> Intent {
        Intent {
            label: label.into(),
            score,
        }
    }

    #[test]
    fn best_intent_is_highest_score() {
        let mut nlu = Nlu {
            intents: vec![intent("HELLO", 0.2), intent("WEATHER", 0.9), intent("TIME", 0.5)],
            ..Default::default()
        };
        nlu.elect_best_intent();
        assert_eq!(nlu.best_intent, "WEATHER");
    }

    #[test]
    fn zero_scores_leave_best_intent_empty() {
        let mut nlu = Nlu {
            intents: vec![intent("HELLO", 0.0)],
            ..Default::default()
        };
        nlu.elect_best_intent();
        assert!(nlu.best_intent.is_empty());
    }

    #[test]
    fn deserializes_pascal_case_payload() {
        let nlu: Nlu = serde_json::from_str(
            r#"{"BestIntent":"","Intents":[{"Label":"WEATHER","Score":0.8}],"Entities":[{"Label":"city","Text":"Paris"}]}"#,
        )
        .unwrap();
        assert_eq!(nlu.intents[0].label, "WEATHER");
        assert_eq!(nlu.entities[0].text, "Paris");
    }

    #[test]
    fn null_lists_decode_as_empty() {
        let mut nlu: Nlu = serde_json::from_str(
            r#"{"BestIntent":"","Intents":[{"Label":"WEATHER","Score":0.9}],"Entities":null}"#,
        )
        .unwrap();
        assert!(nlu.entities.is_empty());
        nlu.elect_best_intent();
        assert_eq!(nlu.best_intent, "WEATHER");

        let nlu: Nlu = serde_json::from_str(r#"{"Intents":null,"Entities":null}"#).unwrap();
        assert!(nlu.intents.is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_yields_error_intent() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = CerebroClient::new(reqwest::Client::new(), "127.0.0.1", port, "understand");
        let nlu = client.understand("hello").await;
        assert_eq!(nlu, Nlu::error());
    }
}
