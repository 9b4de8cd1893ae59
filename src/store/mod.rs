//! Persistence layer: SQLite-backed registry of ability backends.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlAbilityStore;
pub use traits::AbilityStore;
