//! Resolution tiers consulted by the registry, in priority order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::cache::TtlCache;
use crate::ability::{Ability, AbilityClient, AbilitySource};
use crate::error::DatabaseError;
use crate::store::AbilityStore;

/// Cache of resolved clients keyed by intent or ability name.
pub type ClientCache = TtlCache<String, AbilityClient>;

/// One place an intent or ability name can be resolved from.
#[async_trait]
pub trait ResolutionTier: Send + Sync {
    fn source(&self) -> AbilitySource;

    /// Resolve `key` to a client, or `None` on a miss. Tiers never fail:
    /// unavailability is a miss.
    async fn lookup(&self, key: &str) -> Option<AbilityClient>;
}

// ── Cache ───────────────────────────────────────────────────────────

pub struct CacheTier {
    cache: Arc<ClientCache>,
}

impl CacheTier {
    pub fn new(cache: Arc<ClientCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ResolutionTier for CacheTier {
    fn source(&self) -> AbilitySource {
        AbilitySource::Cache
    }

    async fn lookup(&self, key: &str) -> Option<AbilityClient> {
        self.cache.get(&key.to_string())
    }
}

// ── Database ────────────────────────────────────────────────────────

pub struct DatabaseTier {
    store: Arc<dyn AbilityStore>,
    http: reqwest::Client,
    timeout: Duration,
}

impl DatabaseTier {
    pub fn new(store: Arc<dyn AbilityStore>, http: reqwest::Client, timeout: Duration) -> Self {
        Self {
            store,
            http,
            timeout,
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, DatabaseError>>,
    ) -> Result<T, DatabaseError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(DatabaseError::Timeout(self.timeout)))
    }

    /// Intent membership first, then the ability name.
    async fn find(&self, key: &str) -> Result<Option<Ability>, DatabaseError> {
        let abilities = self.bounded(self.store.get_by_intent(key)).await?;
        if let Some(first) = abilities.first() {
            if abilities.len() > 1 {
                let candidates: Vec<&str> = abilities.iter().map(|a| a.name.as_str()).collect();
                warn!(
                    intent = %key,
                    chosen = %first.name,
                    ?candidates,
                    "Several abilities registered for the same intent, using the most recently updated"
                );
            }
            return Ok(abilities.into_iter().next());
        }
        self.bounded(self.store.get_by_name(key)).await
    }
}

#[async_trait]
impl ResolutionTier for DatabaseTier {
    fn source(&self) -> AbilitySource {
        AbilitySource::Database
    }

    async fn lookup(&self, key: &str) -> Option<AbilityClient> {
        match self.find(key).await {
            Ok(found) => found.map(|ability| AbilityClient::from_ability(self.http.clone(), &ability)),
            Err(e) => {
                warn!(intent_or_ability = %key, error = %e, "Ability store lookup failed, treating as a miss");
                None
            }
        }
    }
}

// ── Config ──────────────────────────────────────────────────────────

/// Read-only index of statically configured abilities, built once at startup.
pub struct ConfigTier {
    clients: HashMap<String, AbilityClient>,
}

impl ConfigTier {
    /// Index every ability under each declared intent and under its own name.
    /// Later abilities win when two declare the same key.
    pub fn new(abilities: &[Ability], http: &reqwest::Client) -> Self {
        let capacity = abilities.iter().map(|a| a.intents.len() + 1).sum();
        let mut clients = HashMap::with_capacity(capacity);
        for ability in abilities {
            let client = AbilityClient::from_ability(http.clone(), ability);
            for intent in &ability.intents {
                if let Some(previous) = clients.insert(intent.clone(), client.clone()) {
                    debug!(
                        intent = %intent,
                        replaced = %previous.name(),
                        by = %client.name(),
                        "Configured intent declared twice"
                    );
                }
            }
            clients.insert(ability.name.clone(), client);
        }
        Self { clients }
    }

    /// Every `(key, client)` pair of the index.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &AbilityClient)> {
        self.clients.iter()
    }
}

#[async_trait]
impl ResolutionTier for ConfigTier {
    fn source(&self) -> AbilitySource {
        AbilitySource::Config
    }

    async fn lookup(&self, key: &str) -> Option<AbilityClient> {
        self.clients.get(key).cloned()
    }
}
