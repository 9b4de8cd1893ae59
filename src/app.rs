//! Wiring of the service from its configuration.

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::{self, AppState};
use crate::config::OratioConfig;
use crate::conversation::TextOrchestrator;
use crate::dispatch::{DispatchConfig, Dispatcher};
use crate::error::{ConfigError, Result};
use crate::nlg::AnimaClient;
use crate::nlu::CerebroClient;
use crate::registry::AbilityRegistry;
use crate::store::{AbilityStore, LibSqlAbilityStore};

/// A fully wired service, ready to serve.
pub struct App {
    pub state: AppState,
    pub sweep: JoinHandle<()>,
}

impl App {
    /// Open the persistent store at the configured path and wire everything.
    pub async fn open(config: &OratioConfig) -> Result<Self> {
        let store = LibSqlAbilityStore::new_local(&config.abilities.db_path).await?;
        Self::with_store(config, Arc::new(store))
    }

    /// Wire the service around an already opened store.
    pub fn with_store(config: &OratioConfig, store: Arc<dyn AbilityStore>) -> Result<Self> {
        let collaborators = reqwest::Client::new();
        let abilities_http = reqwest::Client::builder()
            .timeout(config.abilities.call_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "ORATIO_ABILITY_TIMEOUT_SECS".to_string(),
                message: e.to_string(),
            })?;

        let registry = Arc::new(AbilityRegistry::new(
            store,
            abilities_http,
            config.abilities.registry_config(),
        ));
        let sweep = registry.spawn_cache_sweep();

        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            DispatchConfig {
                stop_intent: config.abilities.stop_intent.clone(),
                local_intents: config.abilities.local_intents.clone(),
            },
        );
        let understander = CerebroClient::new(
            collaborators.clone(),
            &config.cerebro.host,
            config.cerebro.port,
            &config.cerebro.endpoint,
        );
        let generator = AnimaClient::new(
            collaborators,
            &config.anima.host,
            config.anima.port,
            &config.anima.endpoint,
        );
        info!(
            cerebro = %understander.url(),
            anima = %generator.url(),
            configured_abilities = config.abilities.list.len(),
            "Collaborators configured"
        );

        let orchestrator = Arc::new(TextOrchestrator::new(
            Arc::new(understander),
            Arc::new(dispatcher),
            Arc::new(generator),
        ));

        Ok(Self {
            state: AppState {
                orchestrator,
                registry,
            },
            sweep,
        })
    }

    pub fn router(&self) -> Router {
        api::router(self.state.clone())
    }
}
