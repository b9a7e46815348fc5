//! Mock implementation of CacheStore for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use super::r#trait::{CacheStore, StoreTier};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    /// `None` when the TTL reaches past the clock's range
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-memory cache store honouring TTLs on the tokio clock
///
/// Records every TTL passed to `set` so tests can assert on it.
#[derive(Clone, Default)]
pub struct MockCacheStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    set_ttls: Arc<Mutex<Vec<(String, Duration)>>>,
    tier: Arc<Mutex<Option<StoreTier>>>,
}

impl MockCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `tier` from every `set`, e.g. to simulate a shared-tier outage
    pub fn reporting_tier(self, tier: StoreTier) -> Self {
        *self.tier.lock().unwrap() = Some(tier);
        self
    }

    /// Raw value stored under `key`, ignoring expiry
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).map(|e| e.value.clone())
    }

    /// Insert a raw value directly
    pub fn insert_raw(&self, key: &str, value: &str, ttl: Duration) {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now().checked_add(ttl),
            },
        );
    }

    /// TTLs passed to `set`, in call order
    pub fn set_ttls(&self) -> Vec<(String, Duration)> {
        self.set_ttls.lock().unwrap().clone()
    }

    /// Whether a live entry exists
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|e| e.is_live(Instant::now()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl CacheStore for MockCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreTier {
        self.insert_raw(key, value, ttl);
        self.set_ttls.lock().unwrap().push((key.to_string(), ttl));
        self.tier.lock().unwrap().unwrap_or(StoreTier::Shared)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return false;
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now.checked_add(ttl),
            },
        );
        true
    }

    async fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}
