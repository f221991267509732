use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Short-lived per-conversation state with a time-to-live
///
/// Holds at most one value per conversation (last write wins). Entries
/// older than the TTL are invisible to readers and reclaimed by
/// [`SessionStore::purge_expired`]; when the store is full the oldest entry
/// makes room for a new conversation.
pub struct SessionStore<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    ttl: Duration,
    capacity: usize,
}

impl<V: Clone + Send> SessionStore<V> {
    /// Create an empty store
    ///
    /// # Arguments
    /// * `ttl` - How long an entry stays readable
    /// * `capacity` - Maximum number of conversations tracked at once
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        SessionStore {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.duration_since(entry.stored_at) >= self.ttl
    }

    /// Store `value` for `key`, replacing any previous value
    pub async fn set(&self, key: &str, value: V) {
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!("Session store full, evicting {}", oldest);
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Read the live value for `key`
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Remove the value for `key`
    ///
    /// # Returns
    /// The removed value if it had not expired yet
    pub async fn delete(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(key)?;
        if self.is_expired(&entry, Instant::now()) {
            None
        } else {
            Some(entry.value)
        }
    }

    /// Keys whose entries have outlived the TTL
    #[allow(dead_code)]
    pub async fn list_expired(&self) -> Vec<String> {
        let entries = self.entries.lock().await;
        let now = Instant::now();
        entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Drop every expired entry
    ///
    /// # Returns
    /// The keys that were removed
    pub async fn purge_expired(&self) -> Vec<String> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let mut purged = Vec::new();
        entries.retain(|key, entry| {
            let expired = self.is_expired(entry, now);
            if expired {
                purged.push(key.clone());
            }
            !expired
        });
        purged
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
