//! HTTP client for a single ability backend.

use super::Ability;
use super::protocol::{Request, Response};
use crate::error::AbilityError;

/// Stateless request/response wrapper around one ability backend.
///
/// Cloning is cheap: the underlying `reqwest::Client` shares its pool.
#[derive(Debug, Clone)]
pub struct AbilityClient {
    name: String,
    host: String,
    port: u16,
    url: String,
    client: reqwest::Client,
}

impl AbilityClient {
    pub fn new(client: reqwest::Client, name: &str, host: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            port,
            url: format!("http://{host}:{port}"),
            client,
        }
    }

    pub fn from_ability(client: reqwest::Client, ability: &Ability) -> Self {
        Self::new(client, &ability.name, &ability.host, ability.port)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL of the backend, without trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Describe this client as an ability indexed under a single key.
    pub fn to_ability(&self, key: &str) -> Ability {
        Ability {
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            intents: vec![key.to_string()],
        }
    }

    /// POST the turn to `{url}/resolve` and decode the ability's reply.
    ///
    /// No retry is attempted. The only time bound is the timeout configured
    /// on the shared `reqwest::Client`.
    pub async fn call_ability(&self, request: &Request) -> Result<Response, AbilityError> {
        let body = serde_json::to_vec(request).map_err(|e| AbilityError::Encode {
            ability: self.name.clone(),
            reason: e.to_string(),
        })?;

        let endpoint = format!("{}/resolve", self.url);
        let resp = self
            .client
            .post(&endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| AbilityError::Transport {
                ability: self.name.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        tracing::info!(ability = %self.name, status = status.as_u16(), url = %endpoint, "POST");
        if !status.is_success() {
            return Err(AbilityError::Status {
                ability: self.name.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| AbilityError::Transport {
            ability: self.name.clone(),
            reason: e.to_string(),
        })?;

        serde_json::from_slice(&bytes).map_err(|e| AbilityError::InvalidResponse {
            ability: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_and_projection() {
        let client = AbilityClient::new(reqwest::Client::new(), "clock", "clock.local", 4444);
        assert_eq!(client.url(), "http://clock.local:4444");

        let ability = client.to_ability("GET_TIME");
        assert_eq!(ability.name, "clock");
        assert_eq!(ability.host, "clock.local");
        assert_eq!(ability.port, 4444);
        assert_eq!(ability.intents, vec!["GET_TIME".to_string()]);
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = AbilityClient::new(reqwest::Client::new(), "ghost", "127.0.0.1", port);
        let err = client.call_ability(&Request::default()).await.unwrap_err();
        assert!(matches!(err, AbilityError::Transport { ref ability, .. } if ability == "ghost"));
    }
}
