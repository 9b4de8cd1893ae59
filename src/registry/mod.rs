//! Ability registry: resolves an intent or ability name to a client.
//!
//! Resolution walks three tiers in a fixed order and stops at the first hit:
//!
//! 1. **cache**: clients resolved recently, expiring after a TTL
//! 2. **database**: the persistent registry, queried by intent
//! 3. **config**: abilities declared in static configuration
//!
//! Database hits are written back to the cache so the next turn for the same
//! intent does not touch the store.

pub mod cache;
pub mod tiers;

pub use cache::{TtlCache, spawn_sweep_task};
pub use tiers::{CacheTier, ClientCache, ConfigTier, DatabaseTier, ResolutionTier};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::ability::{Abilities, Ability, AbilityClient, AbilitySource};
use crate::error::{DatabaseError, RegistryError};
use crate::store::AbilityStore;

/// Registry settings, usually taken from [`crate::config::AbilitiesConfig`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub cache_expiration: Duration,
    pub cache_cleanup_interval: Duration,
    pub store_timeout: Duration,
    pub abilities: Vec<Ability>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_expiration: Duration::from_secs(300),
            cache_cleanup_interval: Duration::from_secs(600),
            store_timeout: Duration::from_secs(3),
            abilities: Vec::new(),
        }
    }
}

pub struct AbilityRegistry {
    cache: Arc<ClientCache>,
    config: Arc<ConfigTier>,
    store: Arc<dyn AbilityStore>,
    tiers: Vec<Arc<dyn ResolutionTier>>,
    store_timeout: Duration,
    cleanup_interval: Duration,
}

impl AbilityRegistry {
    pub fn new(store: Arc<dyn AbilityStore>, http: reqwest::Client, config: RegistryConfig) -> Self {
        let cache = Arc::new(ClientCache::new(config.cache_expiration));
        let config_tier = Arc::new(ConfigTier::new(&config.abilities, &http));

        let tiers: Vec<Arc<dyn ResolutionTier>> = vec![
            Arc::new(CacheTier::new(Arc::clone(&cache))),
            Arc::new(DatabaseTier::new(
                Arc::clone(&store),
                http,
                config.store_timeout,
            )),
            Arc::clone(&config_tier) as Arc<dyn ResolutionTier>,
        ];

        Self {
            cache,
            config: config_tier,
            store,
            tiers,
            store_timeout: config.store_timeout,
            cleanup_interval: config.cache_cleanup_interval,
        }
    }

    /// Start the periodic sweep of expired cache entries.
    pub fn spawn_cache_sweep(&self) -> tokio::task::JoinHandle<()> {
        spawn_sweep_task(Arc::clone(&self.cache), self.cleanup_interval)
    }

    /// Resolve `key` (an intent or an ability name) across all tiers.
    pub async fn lookup(&self, key: &str) -> Option<(AbilityClient, AbilitySource)> {
        for tier in &self.tiers {
            let Some(client) = tier.lookup(key).await else {
                continue;
            };
            let source = tier.source();
            debug!(
                intent_or_ability = %key,
                client = %client.name(),
                %source,
                "Resolved the client to request ability"
            );

            if source == AbilitySource::Database
                && let Err(e) = self.cache.add(key.to_string(), client.clone())
            {
                warn!(
                    intent_or_ability = %key,
                    client = %client.name(),
                    error = %e,
                    "Failed to add the client to the cache"
                );
            }
            return Some((client, source));
        }

        error!(intent_or_ability = %key, "Didn't find any ability for this intent or ability name");
        None
    }

    /// Cached clients, one entry per cached key.
    pub fn list_cache(&self) -> Vec<Ability> {
        let mut abilities: Vec<Ability> = self
            .cache
            .items()
            .into_iter()
            .map(|(key, client)| client.to_ability(&key))
            .collect();
        abilities.sort_by(|a, b| a.intents.cmp(&b.intents));
        abilities
    }

    /// Abilities registered in the persistent store.
    pub async fn list_database(&self) -> Result<Vec<Ability>, RegistryError> {
        self.bounded(self.store.get_all())
            .await
            .map_err(|source| RegistryError::Listing {
                from: AbilitySource::Database.to_string(),
                source,
            })
    }

    /// Configured clients, one entry per indexed key.
    pub fn list_config(&self) -> Vec<Ability> {
        let mut abilities: Vec<Ability> = self
            .config
            .entries()
            .map(|(key, client)| client.to_ability(key))
            .collect();
        abilities.sort_by(|a, b| a.intents.cmp(&b.intents));
        abilities
    }

    /// Everything every tier knows about.
    pub async fn list_all(&self) -> Result<Abilities, RegistryError> {
        let cache = self.list_cache();
        let database = self.list_database().await.inspect_err(|e| {
            error!(error = %e, "An error occurred while fetching abilities from database");
        })?;
        let config = self.list_config();
        Ok(Abilities {
            cache,
            database,
            config,
        })
    }

    /// Upsert an ability in the persistent store, keyed by name.
    pub async fn create_or_update(&self, ability: &Ability) -> Result<Ability, DatabaseError> {
        self.bounded(self.store.create_or_update(ability)).await
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, DatabaseError>>,
    ) -> Result<T, DatabaseError> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .unwrap_or(Err(DatabaseError::Timeout(self.store_timeout)))
    }
}
