//! Abilities: backend registrations and the wire protocol spoken with them.

pub mod client;
pub mod protocol;

pub use client::AbilityClient;
pub use protocol::{Context, Device, Request, Response};

use serde::{Deserialize, Serialize};

/// Registration of one ability backend and the intents it serves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default, deserialize_with = "crate::nlg::null_as_default")]
    pub intents: Vec<String>,
}

/// Where a resolved client came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilitySource {
    Cache,
    Database,
    Config,
}

impl AbilitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbilitySource::Cache => "cache",
            AbilitySource::Database => "database",
            AbilitySource::Config => "config",
        }
    }
}

impl std::fmt::Display for AbilitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AbilitySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache" => Ok(AbilitySource::Cache),
            "database" => Ok(AbilitySource::Database),
            "config" => Ok(AbilitySource::Config),
            other => Err(format!("unknown ability source: {other}")),
        }
    }
}

/// Abilities known to every tier, as returned by the admin listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Abilities {
    pub cache: Vec<Ability>,
    pub database: Vec<Ability>,
    pub config: Vec<Ability>,
}
