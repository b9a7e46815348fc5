//! Refresh lease built on the cache store's conditional set
//!
//! A lease is a `lock:{key}` entry created with `set_if_absent`. While it
//! exists, every other caller treats the refresh of `key` as taken and waits
//! for the holder to publish a fresh record instead of calling the issuer.

use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use tk_shared::config::LeaseConfig;

use crate::domain::value_objects::CacheKey;
use crate::repositories::CacheStore;

/// Result of waiting for a lease
#[derive(Debug)]
pub enum LeaseOutcome<T> {
    /// This caller holds the lease and must release it
    Acquired(LeaseGuard),
    /// Another holder published a usable value while we waited
    Resolved(T),
    /// The wait budget ran out without either of the above
    TimedOut { waited: Duration, attempts: u32 },
}

/// Lease factory bound to a store and a contention policy
#[derive(Clone)]
pub struct Lease {
    store: Arc<dyn CacheStore>,
    config: LeaseConfig,
}

impl Lease {
    pub fn new(store: Arc<dyn CacheStore>, config: LeaseConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LeaseConfig {
        &self.config
    }

    /// Single acquisition attempt
    pub async fn try_acquire(&self, key: &CacheKey) -> Option<LeaseGuard> {
        let lock_key = key.lock_key();
        let holder = Uuid::new_v4().to_string();
        let ttl = self.config.ttl();

        if self.store.set_if_absent(&lock_key, &holder, ttl).await {
            debug!(lock_key = %lock_key, holder = %holder, "Lease acquired");
            Some(LeaseGuard {
                store: self.store.clone(),
                lock_key,
                holder,
                ttl,
                acquired_at: Instant::now(),
            })
        } else {
            None
        }
    }

    /// Acquire the lease for `key`, or stop early once `recheck` yields a value
    ///
    /// Between attempts the caller sleeps with capped exponential backoff and
    /// jitter, then runs `recheck`. Waiting is bounded by both
    /// `max_attempts` and `max_wait`.
    pub async fn acquire<T, P, Fut>(&self, key: &CacheKey, mut recheck: P) -> LeaseOutcome<T>
    where
        P: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let started = Instant::now();
        let max_wait = self.config.max_wait();
        let mut backoff = self.config.initial_backoff();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            if let Some(guard) = self.try_acquire(key).await {
                return LeaseOutcome::Acquired(guard);
            }

            let waited = started.elapsed();
            if attempts >= self.config.max_attempts || waited >= max_wait {
                break;
            }

            let delay = jittered(backoff).min(max_wait - waited);
            debug!(
                key = %key,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                "Lease held elsewhere, backing off"
            );
            tokio::time::sleep(delay).await;

            if let Some(value) = recheck().await {
                debug!(key = %key, attempts, "Resolved by another holder while waiting");
                return LeaseOutcome::Resolved(value);
            }

            backoff = (backoff * 2).min(self.config.max_backoff());
        }

        let waited = started.elapsed();
        warn!(
            key = %key,
            attempts,
            waited_ms = waited.as_millis() as u64,
            "Gave up waiting for lease"
        );
        LeaseOutcome::TimedOut { waited, attempts }
    }
}

/// Proof of holding a lease
///
/// Dropping a guard without calling [`LeaseGuard::release`] leaves the lock
/// entry in place until its TTL elapses.
pub struct LeaseGuard {
    store: Arc<dyn CacheStore>,
    lock_key: String,
    holder: String,
    ttl: Duration,
    acquired_at: Instant,
}

impl std::fmt::Debug for LeaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseGuard")
            .field("lock_key", &self.lock_key)
            .field("holder", &self.holder)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl LeaseGuard {
    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Whether the lease TTL has run out, in which case another caller may hold it
    pub fn is_expired(&self) -> bool {
        self.acquired_at.elapsed() >= self.ttl
    }

    /// Release the lease
    ///
    /// Once the TTL has elapsed the lock may belong to someone else, so the
    /// entry is left alone.
    pub async fn release(self) {
        if self.is_expired() {
            warn!(
                lock_key = %self.lock_key,
                holder = %self.holder,
                held_ms = self.acquired_at.elapsed().as_millis() as u64,
                "Lease outlived its TTL, skipping release"
            );
            return;
        }
        self.store.delete(&self.lock_key).await;
        debug!(lock_key = %self.lock_key, holder = %self.holder, "Lease released");
    }
}

/// Random delay in `[backoff / 2, backoff]`
fn jittered(backoff: Duration) -> Duration {
    let max = backoff.as_millis().max(1) as u64;
    let min = (max / 2).max(1);
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}
