//! In-process TTL cache.
//!
//! Each entry remembers when it was written; reads treat an entry as present
//! only while `now - written_at < ttl`. Expired entries are dropped on the
//! next write. Instances are owned by whoever needs
//! them (the price source, the refresh orchestrator), never global.

use crate::clock::Clock;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

struct Entry<V> {
    value: V,
    written_at: NaiveDateTime,
}

pub struct TtlCache<K, V> {
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn is_live(&self, written_at: NaiveDateTime, now: NaiveDateTime) -> bool {
        now - written_at < self.ttl
    }

    /// Value for `key` if it was written less than `ttl` ago
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| self.is_live(e.written_at, now))
            .map(|e| e.value.clone())
    }

    /// True while the entry for `key` has not expired
    pub async fn is_fresh(&self, key: &K) -> bool {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .map(|e| self.is_live(e.written_at, now))
            .unwrap_or(false)
    }

    /// When `key` was last written, until the next write evicts it
    pub async fn written_at(&self, key: &K) -> Option<NaiveDateTime> {
        self.entries.read().await.get(key).map(|e| e.written_at)
    }

    /// Store `value` under `key`, evicting every entry that has expired
    pub async fn insert(&self, key: K, value: V) {
        let written_at = self.clock.now();
        let ttl = self.ttl;
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| written_at - e.written_at < ttl);
        entries.insert(key, Entry { value, written_at });
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
