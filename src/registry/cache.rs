//! Concurrent key/value cache whose entries expire after a fixed TTL.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::debug;

use crate::error::RegistryError;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Expiring map. Reads never return an expired entry even if the sweep has
/// not run yet; the sweep only reclaims memory.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Get a live entry, dropping it if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, e| e.is_expired(now));
        None
    }

    /// Insert only if no live entry exists for `key`.
    pub fn add(&self, key: K, value: V) -> Result<(), RegistryError> {
        let now = Instant::now();
        let fresh = CacheEntry {
            value,
            expires_at: now + self.ttl,
        };
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired(now) {
                    return Err(RegistryError::CacheKeyExists {
                        key: occupied.key().to_string(),
                    });
                }
                occupied.insert(fresh);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
            }
        }
        Ok(())
    }

    /// Insert or replace, restarting the TTL.
    pub fn set(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Snapshot of every live entry.
    pub fn items(&self) -> Vec<(K, V)> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| !e.value().is_expired(now))
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn delete_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Spawn a background task that periodically sweeps expired entries.
pub fn spawn_sweep_task<K, V>(
    cache: Arc<TtlCache<K, V>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.delete_expired();
            if removed > 0 {
                debug!(removed, "Swept expired cache entries");
            }
        }
    })
}
