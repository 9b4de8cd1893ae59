//! `AbilityStore` trait: the persistent registry of ability backends.

use async_trait::async_trait;

use crate::ability::Ability;
use crate::error::DatabaseError;

/// Backend-agnostic store of ability registrations, keyed by name.
#[async_trait]
pub trait AbilityStore: Send + Sync {
    /// Insert or fully replace the ability with the same name. Returns the stored record.
    async fn create_or_update(&self, ability: &Ability) -> Result<Ability, DatabaseError>;

    /// All registered abilities.
    async fn get_all(&self) -> Result<Vec<Ability>, DatabaseError>;

    /// Abilities declaring `intent`, most recently updated first, then by name.
    async fn get_by_intent(&self, intent: &str) -> Result<Vec<Ability>, DatabaseError>;

    /// The ability registered under `name`, if any.
    async fn get_by_name(&self, name: &str) -> Result<Option<Ability>, DatabaseError>;
}
