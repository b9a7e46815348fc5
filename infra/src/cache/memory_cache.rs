//! In-process fallback tier
//!
//! Entries carry an absolute expiry on the tokio clock and are purged lazily
//! when touched. An entry is gone at exactly its expiry instant. A TTL too
//! large for the clock leaves the entry without an expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: &str, now: Instant, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: now.checked_add(ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Process-local key-value map with per-entry TTL
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                debug!("Purged expired local entry '{}'", key);
                None
            }
            None => None,
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let entry = Entry::new(value, Instant::now(), ttl);
        self.entries.lock().await.insert(key.to_string(), entry);
    }

    /// Insert only if no live entry exists; `true` when inserted
    pub async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return false;
        }
        entries.insert(key.to_string(), Entry::new(value, now, ttl));
        true
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until purged
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
