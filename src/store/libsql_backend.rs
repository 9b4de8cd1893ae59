//! libSQL backend: async `AbilityStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::ability::Ability;
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::AbilityStore;

const ABILITY_COLUMNS: &str = "a.name, a.host, a.port, i.intent";

/// libSQL ability store.
///
/// Everything runs on a single connection, so an open transaction is visible
/// to any query issued on it. Reads therefore hold `tx_lock` shared and
/// upserts hold it exclusively: a reader never sees an ability between the
/// removal of its old intents and the insertion of the new ones.
pub struct LibSqlAbilityStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    tx_lock: RwLock<()>,
}

impl LibSqlAbilityStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Ability store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
            tx_lock: RwLock::new(()),
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn query_abilities(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        op: &str,
    ) -> Result<Vec<Ability>, DatabaseError> {
        let _guard = self.tx_lock.read().await;
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut abilities: Vec<Ability> = Vec::new();
        loop {
            let row = match rows.next().await {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("{op}: {e}"))),
            };
            match row_to_parts(&row) {
                Ok((name, host, port, intent)) => {
                    // Rows are grouped by ability, so only the last entry can match.
                    match abilities.last_mut() {
                        Some(last) if last.name == name => {
                            if let Some(intent) = intent {
                                last.intents.push(intent);
                            }
                        }
                        _ => abilities.push(Ability {
                            name,
                            host,
                            port,
                            intents: intent.into_iter().collect(),
                        }),
                    }
                }
                Err(e) => warn!("Skipping ability row: {e}"),
            }
        }
        Ok(abilities)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Column order matches ABILITY_COLUMNS: 0:name, 1:host, 2:port, 3:intent (nullable).
fn row_to_parts(row: &libsql::Row) -> Result<(String, String, u16, Option<String>), String> {
    let name: String = row.get(0).map_err(|e| e.to_string())?;
    let host: String = row.get(1).map_err(|e| e.to_string())?;
    let port: i64 = row.get(2).map_err(|e| e.to_string())?;
    let port = u16::try_from(port).map_err(|_| format!("port {port} out of range for {name}"))?;
    let intent: Option<String> = row.get::<String>(3).ok();
    Ok((name, host, port, intent))
}

/// Fixed-width timestamps so that lexical order is chronological order.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn normalized_intents(intents: &[String]) -> Vec<String> {
    let mut intents: Vec<String> = intents
        .iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    intents.sort();
    intents.dedup();
    intents
}

#[async_trait]
impl AbilityStore for LibSqlAbilityStore {
    async fn create_or_update(&self, ability: &Ability) -> Result<Ability, DatabaseError> {
        if ability.name.trim().is_empty() {
            return Err(DatabaseError::Constraint(
                "ability name must not be empty".to_string(),
            ));
        }

        let intents = normalized_intents(&ability.intents);
        let now = now_timestamp();

        let _guard = self.tx_lock.write().await;
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("create_or_update: {e}")))?;

        tx.execute(
            "INSERT INTO abilities (name, host, port, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(name) DO UPDATE SET
                host = excluded.host,
                port = excluded.port,
                updated_at = excluded.updated_at",
            params![
                ability.name.as_str(),
                ability.host.as_str(),
                i64::from(ability.port),
                now.as_str()
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("create_or_update: {e}")))?;

        tx.execute(
            "DELETE FROM ability_intents WHERE ability_name = ?1",
            params![ability.name.as_str()],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("create_or_update: {e}")))?;

        for intent in &intents {
            tx.execute(
                "INSERT INTO ability_intents (ability_name, intent) VALUES (?1, ?2)",
                params![ability.name.as_str(), intent.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_or_update: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("create_or_update commit: {e}")))?;

        debug!(ability = %ability.name, intents = intents.len(), "Ability upserted");
        Ok(Ability {
            name: ability.name.clone(),
            host: ability.host.clone(),
            port: ability.port,
            intents,
        })
    }

    async fn get_all(&self) -> Result<Vec<Ability>, DatabaseError> {
        self.query_abilities(
            &format!(
                "SELECT {ABILITY_COLUMNS} FROM abilities a
                 LEFT JOIN ability_intents i ON i.ability_name = a.name
                 ORDER BY a.name, i.intent"
            ),
            (),
            "get_all",
        )
        .await
    }

    async fn get_by_intent(&self, intent: &str) -> Result<Vec<Ability>, DatabaseError> {
        self.query_abilities(
            &format!(
                "SELECT {ABILITY_COLUMNS} FROM abilities a
                 JOIN ability_intents m ON m.ability_name = a.name AND m.intent = ?1
                 LEFT JOIN ability_intents i ON i.ability_name = a.name
                 ORDER BY a.updated_at DESC, a.name, i.intent"
            ),
            params![intent],
            "get_by_intent",
        )
        .await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Ability>, DatabaseError> {
        let found = self
            .query_abilities(
                &format!(
                    "SELECT {ABILITY_COLUMNS} FROM abilities a
                     LEFT JOIN ability_intents i ON i.ability_name = a.name
                     WHERE a.name = ?1
                     ORDER BY i.intent"
                ),
                params![name],
                "get_by_name",
            )
            .await?;
        Ok(found.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> LibSqlAbilityStore {
        LibSqlAbilityStore::new_memory().await.unwrap()
    }

    fn ability(name: &str, port: u16, intents: &[&str]) -> Ability {
        Ability {
            name: name.into(),
            host: "localhost".into(),
            port,
            intents: intents.iter().map(|i| i.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn create_and_get_all() {
        let store = test_store().await;
        let stored = store
            .create_or_update(&ability("weather", 4444, &["WEATHER", "FORECAST"]))
            .await
            .unwrap();
        assert_eq!(stored.intents, vec!["FORECAST", "WEATHER"]);

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], stored);
    }

    #[tokio::test]
    async fn upsert_replaces_by_name() {
        let store = test_store().await;
        store
            .create_or_update(&ability("weather", 4444, &["WEATHER"]))
            .await
            .unwrap();
        store
            .create_or_update(&ability("weather", 5555, &["FORECAST"]))
            .await
            .unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].port, 5555);
        assert_eq!(all[0].intents, vec!["FORECAST"]);
        assert!(store.get_by_intent("WEATHER").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_by_intent_returns_full_intent_set() {
        let store = test_store().await;
        store
            .create_or_update(&ability("shopping", 4000, &["ADD_ITEM", "LIST_ITEMS"]))
            .await
            .unwrap();
        store
            .create_or_update(&ability("clock", 4001, &["GET_TIME"]))
            .await
            .unwrap();

        let found = store.get_by_intent("ADD_ITEM").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "shopping");
        assert_eq!(found[0].intents, vec!["ADD_ITEM", "LIST_ITEMS"]);

        assert!(store.get_by_intent("UNKNOWN").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ambiguous_intent_prefers_most_recent_registration() {
        let store = test_store().await;
        store
            .create_or_update(&ability("old-weather", 4000, &["WEATHER"]))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .create_or_update(&ability("new-weather", 4001, &["WEATHER"]))
            .await
            .unwrap();

        let found = store.get_by_intent("WEATHER").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "new-weather");
        assert_eq!(found[1].name, "old-weather");
    }

    #[tokio::test]
    async fn get_by_name_finds_registered_ability() {
        let store = test_store().await;
        store
            .create_or_update(&ability("shopping", 4000, &["LIST_ITEMS", "ADD_ITEM"]))
            .await
            .unwrap();

        let found = store.get_by_name("shopping").await.unwrap().unwrap();
        assert_eq!(found.port, 4000);
        assert_eq!(found.intents, vec!["ADD_ITEM", "LIST_ITEMS"]);

        assert!(store.get_by_name("ADD_ITEM").await.unwrap().is_none());
        assert!(store.get_by_name("ghost").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn readers_never_see_a_half_replaced_intent_set() {
        let store = Arc::new(test_store().await);
        store
            .create_or_update(&ability("weather", 4000, &["WEATHER"]))
            .await
            .unwrap();

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for port in 0..300u16 {
                    store
                        .create_or_update(&ability("weather", 4000 + port, &["WEATHER"]))
                        .await
                        .unwrap();
                }
            })
        };
        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut misses = 0;
                for _ in 0..300 {
                    if store.get_by_intent("WEATHER").await.unwrap().is_empty() {
                        misses += 1;
                    }
                    if store.get_all().await.unwrap()[0].intents.is_empty() {
                        misses += 1;
                    }
                }
                misses
            })
        };

        writer.await.unwrap();
        assert_eq!(reader.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ability_without_intents_is_listed() {
        let store = test_store().await;
        store.create_or_update(&ability("idle", 4000, &[])).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].intents.is_empty());
    }

    #[tokio::test]
    async fn duplicate_and_blank_intents_are_dropped() {
        let store = test_store().await;
        let stored = store
            .create_or_update(&ability("clock", 4000, &["GET_TIME", " GET_TIME ", ""]))
            .await
            .unwrap();
        assert_eq!(stored.intents, vec!["GET_TIME"]);
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let store = test_store().await;
        let err = store
            .create_or_update(&ability("  ", 4000, &["X"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint(_)));
    }

    #[tokio::test]
    async fn local_file_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("oratio.db");
        {
            let store = LibSqlAbilityStore::new_local(&path).await.unwrap();
            store
                .create_or_update(&ability("clock", 4000, &["GET_TIME"]))
                .await
                .unwrap();
        }
        let store = LibSqlAbilityStore::new_local(&path).await.unwrap();
        let found = store.get_by_intent("GET_TIME").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "clock");
    }
}
