//! NLG collaborator (Anima): renders a structured reply into a sentence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

const SERVICE: &str = "anima";

/// Structured sentence returned by an ability, rendered by the NLG service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nlg {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sentence: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "crate::nlg::null_as_default")]
    pub params: Vec<NlgParam>,
}

impl Nlg {
    pub fn sentence(sentence: impl Into<String>) -> Self {
        Self {
            sentence: sentence.into(),
            params: Vec::new(),
        }
    }
}

/// A named, typed value interpolated into an NLG sentence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NlgParam {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub value: serde_json::Value,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// Turns an [`Nlg`] into the text spoken back to the user.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, nlg: &Nlg) -> Result<String, CollaboratorError>;
}

/// HTTP client for the Anima restitution endpoint.
pub struct AnimaClient {
    client: reqwest::Client,
    url: String,
}

impl AnimaClient {
    pub fn new(client: reqwest::Client, host: &str, port: u16, restitute_endpoint: &str) -> Self {
        Self {
            client,
            url: format!("http://{host}:{port}{}", normalize_endpoint(restitute_endpoint)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Generator for AnimaClient {
    async fn generate(&self, nlg: &Nlg) -> Result<String, CollaboratorError> {
        let resp = self
            .client
            .post(&self.url)
            .json(nlg)
            .send()
            .await
            .map_err(|e| CollaboratorError::RequestFailed {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        tracing::debug!(client = SERVICE, status = status.as_u16(), url = %self.url, "POST");
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                service: SERVICE.into(),
                status: status.as_u16(),
            });
        }

        resp.text()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse {
                service: SERVICE.into(),
                reason: e.to_string(),
            })
    }
}

/// Deserialize an explicit `null` as the type's default, as sent for nil
/// slices and maps by collaborators that do not omit empty fields.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Ensure a configured endpoint path starts with `/`.
pub(crate) fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_gets_leading_slash() {
        assert_eq!(normalize_endpoint("restitute"), "/restitute");
        assert_eq!(normalize_endpoint("/restitute"), "/restitute");
    }

    #[test]
    fn client_url_is_built_from_host_and_port() {
        let client = AnimaClient::new(reqwest::Client::new(), "anima", 9333, "restitute");
        assert_eq!(client.url(), "http://anima:9333/restitute");
    }

    #[test]
    fn nlg_serializes_param_type_field() {
        let nlg = Nlg {
            sentence: "It is {{time}}".into(),
            params: vec![NlgParam {
                name: "time".into(),
                value: serde_json::json!("12 h 30"),
                kind: "time".into(),
            }],
        };
        let json = serde_json::to_value(&nlg).unwrap();
        assert_eq!(json["params"][0]["type"], "time");
        assert_eq!(json["params"][0]["value"], "12 h 30");
    }

    #[test]
    fn empty_nlg_serializes_to_empty_object() {
        let json = serde_json::to_value(Nlg::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
