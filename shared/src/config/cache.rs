//! Cache configuration module

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::env_or;

/// Cache tier configuration (Redis shared tier + in-process fallback tier)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Response timeout in milliseconds for a single shared-tier operation
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    /// Key prefix applied to every shared-tier key
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Redis database number (0-15)
    #[serde(default)]
    pub database: u8,

    /// Maximum attempts for a single shared-tier operation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between attempts (exponential backoff)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// How long the shared tier is bypassed after a failure
    #[serde(default = "default_failover_cooldown")]
    pub failover_cooldown_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://localhost:6379"),
            connection_timeout: default_connection_timeout(),
            response_timeout_ms: default_response_timeout_ms(),
            key_prefix: None,
            database: 0,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            failover_cooldown_seconds: default_failover_cooldown(),
        }
    }
}

impl CacheConfig {
    /// Create from environment variables
    ///
    /// `REDIS_URL` wins; otherwise the URL is assembled from `REDIS_HOST` and `REDIS_PORT`.
    pub fn from_env() -> Self {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| {
            let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
            let port: u16 = env_or("REDIS_PORT", 6379);
            format!("redis://{}:{}", host, port)
        });
        let key_prefix = std::env::var("REDIS_KEY_PREFIX")
            .ok()
            .filter(|prefix| !prefix.is_empty());

        Self {
            url,
            key_prefix,
            database: env_or("REDIS_DATABASE", 0u8).min(15),
            response_timeout_ms: env_or("REDIS_RESPONSE_TIMEOUT_MS", default_response_timeout_ms()),
            max_retries: env_or("REDIS_MAX_RETRIES", default_max_retries()),
            failover_cooldown_seconds: env_or(
                "REDIS_FAILOVER_COOLDOWN_SECONDS",
                default_failover_cooldown(),
            ),
            ..Default::default()
        }
    }

    /// Create a new cache configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix for all cache keys
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the database number
    pub fn with_database(mut self, db: u8) -> Self {
        self.database = db.min(15);
        self
    }

    /// Generate a cache key with prefix
    pub fn make_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn failover_cooldown(&self) -> Duration {
        Duration::from_secs(self.failover_cooldown_seconds)
    }
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_response_timeout_ms() -> u64 {
    500
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    50
}

fn default_failover_cooldown() -> u64 {
    5
}
