//! Error types for Oratio.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Ability error: {0}")]
    Ability(#[from] AbilityError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistent store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures of an outbound call to an ability backend.
#[derive(Debug, thiserror::Error)]
pub enum AbilityError {
    #[error("Failed to encode request for ability {ability}: {reason}")]
    Encode { ability: String, reason: String },

    #[error("Request to ability {ability} failed: {reason}")]
    Transport { ability: String, reason: String },

    #[error("Ability {ability} answered with status {status}")]
    Status { ability: String, status: u16 },

    #[error("Invalid response from ability {ability}: {reason}")]
    InvalidResponse { ability: String, reason: String },
}

/// Registry and cache errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Cache already holds a live entry for {key}")]
    CacheKeyExists { key: String },

    #[error("Failed to list {from} abilities: {source}")]
    Listing {
        from: String,
        #[source]
        source: DatabaseError,
    },
}

/// Failures of the NLU and NLG collaborators.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("Request to {service} failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("{service} answered with status {status}")]
    Status { service: String, status: u16 },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
