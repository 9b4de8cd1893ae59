//! Configuration types, built from `ORATIO_*` environment variables.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::ability::Ability;
use crate::error::ConfigError;
use crate::registry::RegistryConfig;

const PREFIX: &str = "ORATIO_";

/// Full service configuration.
#[derive(Debug, Clone, Serialize)]
pub struct OratioConfig {
    pub server: ServerConfig,
    pub cerebro: ServiceConfig,
    pub anima: ServiceConfig,
    pub abilities: AbilitiesConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub port: u16,
    /// `EnvFilter` directive; `None` defers to `RUST_LOG`.
    pub log_level: Option<String>,
}

/// Location of an HTTP collaborator (NLU or NLG).
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AbilitiesConfig {
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Bound on every store call.
    pub store_timeout: Duration,
    /// Time a resolved client stays in the cache.
    pub cache_expiration: Duration,
    /// Period of the expired-entry sweep.
    pub cache_cleanup_interval: Duration,
    /// Request timeout of the HTTP client shared by ability clients.
    pub call_timeout: Duration,
    /// Intent that ends any running conversation.
    pub stop_intent: String,
    /// Intents answered locally with a fixed sentence, bypassing abilities.
    pub local_intents: HashMap<String, String>,
    /// Statically configured abilities, the last-resort resolution tier.
    pub list: Vec<Ability>,
}

impl AbilitiesConfig {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            cache_expiration: self.cache_expiration,
            cache_cleanup_interval: self.cache_cleanup_interval,
            store_timeout: self.store_timeout,
            abilities: self.list.clone(),
        }
    }
}

impl Default for OratioConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 8080,
                log_level: None,
            },
            cerebro: ServiceConfig {
                host: "localhost".to_string(),
                port: 9444,
                endpoint: "/understand".to_string(),
            },
            anima: ServiceConfig {
                host: "localhost".to_string(),
                port: 9333,
                endpoint: "/restitute".to_string(),
            },
            abilities: AbilitiesConfig {
                db_path: PathBuf::from("./data/oratio.db"),
                store_timeout: Duration::from_secs(3),
                cache_expiration: Duration::from_secs(300),
                cache_cleanup_interval: Duration::from_secs(600),
                call_timeout: Duration::from_secs(10),
                stop_intent: "STOP".to_string(),
                local_intents: HashMap::from([("HELLO".to_string(), "Hello".to_string())]),
                list: Vec::new(),
            },
        }
    }
}

impl OratioConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable source. Keys are looked up
    /// with their `ORATIO_` prefix.
    pub fn from_vars<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { get };
        let defaults = Self::default();

        let server = ServerConfig {
            port: vars.parse("PORT", defaults.server.port)?,
            log_level: vars.string("LOG_LEVEL"),
        };

        let cerebro = ServiceConfig {
            host: vars.string("CEREBRO_HOST").unwrap_or(defaults.cerebro.host),
            port: vars.parse("CEREBRO_PORT", defaults.cerebro.port)?,
            endpoint: vars
                .string("CEREBRO_UNDERSTAND_ENDPOINT")
                .unwrap_or(defaults.cerebro.endpoint),
        };

        let anima = ServiceConfig {
            host: vars.string("ANIMA_HOST").unwrap_or(defaults.anima.host),
            port: vars.parse("ANIMA_PORT", defaults.anima.port)?,
            endpoint: vars
                .string("ANIMA_RESTITUTE_ENDPOINT")
                .unwrap_or(defaults.anima.endpoint),
        };

        let d = defaults.abilities;
        let list = match (vars.string("ABILITIES"), vars.string("ABILITIES_FILE")) {
            (Some(json), _) => parse_json::<Vec<Ability>>("ABILITIES", &json)?,
            (None, Some(path)) => {
                let json = std::fs::read_to_string(&path)?;
                parse_json::<Vec<Ability>>("ABILITIES_FILE", &json)?
            }
            (None, None) => d.list,
        };
        let local_intents = match vars.string("LOCAL_INTENTS") {
            Some(json) => parse_json::<HashMap<String, String>>("LOCAL_INTENTS", &json)?,
            None => d.local_intents,
        };

        let abilities = AbilitiesConfig {
            db_path: vars.string("DB_PATH").map(PathBuf::from).unwrap_or(d.db_path),
            store_timeout: vars.secs("STORE_TIMEOUT_SECS", d.store_timeout)?,
            cache_expiration: vars.secs("CACHE_EXPIRATION_SECS", d.cache_expiration)?,
            cache_cleanup_interval: vars
                .secs("CACHE_CLEANUP_INTERVAL_SECS", d.cache_cleanup_interval)?,
            call_timeout: vars.secs("ABILITY_TIMEOUT_SECS", d.call_timeout)?,
            stop_intent: vars.string("STOP_INTENT").unwrap_or(d.stop_intent),
            local_intents,
            list,
        };

        validate_abilities(&abilities.list)?;

        if abilities.cache_cleanup_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: format!("{PREFIX}CACHE_CLEANUP_INTERVAL_SECS"),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            server,
            cerebro,
            anima,
            abilities,
        })
    }
}

struct Vars<F> {
    get: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty, trimmed value of `ORATIO_{key}`.
    fn string(&self, key: &str) -> Option<String> {
        (self.get)(&format!("{PREFIX}{key}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.string(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: format!("{PREFIX}{key}"),
                message: format!("{raw:?}: {e}"),
            }),
            None => Ok(default),
        }
    }

    fn secs(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse(key, default.as_secs()).map(Duration::from_secs)
    }
}

/// Reject configured abilities indexed under an empty key.
fn validate_abilities(abilities: &[Ability]) -> Result<(), ConfigError> {
    for (index, ability) in abilities.iter().enumerate() {
        if ability.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: format!("{PREFIX}ABILITIES"),
                message: format!("ability #{index} has an empty name"),
            });
        }
        if ability.intents.iter().any(|i| i.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: format!("{PREFIX}ABILITIES"),
                message: format!("ability {:?} declares an empty intent", ability.name),
            });
        }
    }
    Ok(())
}

fn parse_json<T: serde::de::DeserializeOwned>(key: &str, raw: &str) -> Result<T, ConfigError> {
    serde_json::from_str(raw)
        .map_err(|e| ConfigError::ParseError(format!("{PREFIX}{key} is not valid JSON: {e}")))
}
