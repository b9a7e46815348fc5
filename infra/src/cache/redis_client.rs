//! Redis cache client implementation
//!
//! Shared tier of the token cache. Every operation is bounded by the
//! configured response timeout and retried with exponential backoff on
//! transient errors. Keys are prefixed with `CacheConfig::key_prefix`.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, IntoConnectionInfo, RedisError, RedisResult};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use tk_shared::config::CacheConfig;
use tk_shared::utils::mask_url;

use super::shared_tier::{SharedCacheTier, SharedEntry};
use crate::InfrastructureError;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis cache client with retry logic
///
/// Cloning is cheap; clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Configuration used to create this client
    config: CacheConfig,
}

impl RedisClient {
    /// Connect to Redis
    ///
    /// # Errors
    ///
    /// * `Config` - the URL cannot be parsed
    /// * `Cache` / `Timeout` - no connection could be established
    ///
    /// # Example
    /// ```no_run
    /// use tk_infra::cache::RedisClient;
    /// use tk_shared::config::CacheConfig;
    ///
    /// async fn create_client() -> Result<RedisClient, Box<dyn std::error::Error>> {
    ///     let config = CacheConfig::new("redis://localhost:6379").with_prefix("tokenkeeper");
    ///     let client = RedisClient::new(config).await?;
    ///     Ok(client)
    /// }
    /// ```
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        info!(
            url = %mask_url(&config.url),
            database = config.database,
            "Creating Redis client"
        );

        let mut connection_info = config.url.as_str().into_connection_info().map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;
        if config.database != 0 {
            connection_info.redis.db = i64::from(config.database);
        }
        let client = Client::open(connection_info).map_err(|e| {
            InfrastructureError::Config(format!("Invalid Redis connection info: {}", e))
        })?;

        let connection = Self::create_connection_with_retry(&client, &config).await?;

        info!("Redis client created successfully");
        Ok(Self { connection, config })
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: &Client,
        config: &CacheConfig,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let max_attempts = config.max_retries.max(1);
        let mut attempts = 0;
        let mut delay = config.retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            let outcome = timeout(
                config.connection_timeout(),
                client.get_multiplexed_async_connection(),
            )
            .await;

            let err = match outcome {
                Ok(Ok(connection)) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Ok(Err(e)) => InfrastructureError::Cache(e),
                Err(_) => InfrastructureError::Timeout {
                    operation: "connect".to_string(),
                },
            };

            if attempts >= max_attempts {
                error!("Failed to connect to Redis after {} attempts: {}", attempts, err);
                return Err(err);
            }
            warn!(
                "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                attempts, max_attempts, err, delay
            );
            sleep(Duration::from_millis(delay)).await;
            // Exponential backoff with cap at 5 seconds
            delay = (delay * 2).min(5000);
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Set a value with expiration time (`SET key value EX ttl`)
    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), InfrastructureError> {
        let key = self.config.make_key(key);
        let seconds = expiry_seconds(ttl);
        debug!("Setting key '{}' with expiry {}s", key, seconds);

        let value = value.to_string();
        self.execute_with_retry("set", move |mut conn| {
            let key = key.clone();
            let value = value.clone();
            Box::pin(async move { conn.set_ex::<_, _, ()>(key, value, seconds).await })
        })
        .await
    }

    /// Set a value only if the key does not exist (`SET key value NX EX ttl`)
    ///
    /// Returns `true` if this call created the key.
    pub async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, InfrastructureError> {
        let key = self.config.make_key(key);
        let seconds = expiry_seconds(ttl);

        let value = value.to_string();
        let reply = self
            .execute_with_retry("set_nx", move |mut conn| {
                let key = key.clone();
                let value = value.clone();
                Box::pin(async move {
                    redis::cmd("SET")
                        .arg(key)
                        .arg(value)
                        .arg("NX")
                        .arg("EX")
                        .arg(seconds)
                        .query_async::<_, Option<String>>(&mut conn)
                        .await
                })
            })
            .await?;
        Ok(reply.is_some())
    }

    /// Get a value from cache
    ///
    /// Returns `None` when the key is missing or expired.
    pub async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        let key = self.config.make_key(key);
        debug!("Getting key '{}'", key);

        self.execute_with_retry("get", move |mut conn| {
            let key = key.clone();
            Box::pin(async move { conn.get::<_, Option<String>>(key).await })
        })
        .await
    }

    /// Get a value with its remaining TTL (`GET` + `PTTL` in one transaction)
    pub async fn get_with_ttl(&self, key: &str) -> Result<Option<SharedEntry>, InfrastructureError> {
        let key = self.config.make_key(key);
        debug!("Getting key '{}' with ttl", key);

        let (value, pttl) = self
            .execute_with_retry("get", move |mut conn| {
                let key = key.clone();
                Box::pin(async move {
                    let mut pipe = redis::pipe();
                    pipe.atomic().get(&key).pttl(&key);
                    pipe.query_async::<_, (Option<String>, i64)>(&mut conn).await
                })
            })
            .await?;

        Ok(value.map(|value| SharedEntry {
            value,
            ttl: remaining_ttl(pttl),
        }))
    }

    /// Delete a key from cache
    ///
    /// Returns `true` if the key existed.
    pub async fn delete(&self, key: &str) -> Result<bool, InfrastructureError> {
        let key = self.config.make_key(key);
        debug!("Deleting key '{}'", key);

        let deleted = self
            .execute_with_retry("delete", move |mut conn| {
                let key = key.clone();
                Box::pin(async move { conn.del::<_, u32>(key).await })
            })
            .await?;
        Ok(deleted > 0)
    }

    /// Check if the Redis connection is healthy
    ///
    /// Performs a PING command to verify connectivity.
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");

        let response = self
            .execute_with_retry("ping", |mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await?;

        if response == "PONG" {
            debug!("Redis health check passed");
            Ok(true)
        } else {
            warn!("Redis health check returned unexpected response: {}", response);
            Ok(false)
        }
    }

    /// Execute a Redis operation with timeout and retry
    ///
    /// Each attempt is bounded by the response timeout. Timeouts are not
    /// retried; transient Redis errors are, with exponential backoff.
    async fn execute_with_retry<F, T>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> Result<T, InfrastructureError>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let max_attempts = self.config.max_retries.max(1);
        let response_timeout = self.config.response_timeout();
        let mut attempts = 0;
        let mut delay = self.config.retry_delay_ms;

        loop {
            attempts += 1;
            let conn = self.connection.clone();

            match timeout(response_timeout, operation(conn)).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if attempts < max_attempts && is_retriable_error(&e) => {
                    warn!(
                        "Redis {} failed (attempt {}/{}): {}. Retrying in {}ms...",
                        operation_name, attempts, max_attempts, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(5000);
                }
                Ok(Err(e)) => {
                    error!("Redis {} failed after {} attempts: {}", operation_name, attempts, e);
                    return Err(InfrastructureError::Cache(e));
                }
                Err(_) => {
                    warn!(
                        "Redis {} timed out after {}ms",
                        operation_name,
                        response_timeout.as_millis()
                    );
                    return Err(InfrastructureError::Timeout {
                        operation: operation_name.to_string(),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl SharedCacheTier for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<SharedEntry>, InfrastructureError> {
        self.get_with_ttl(key).await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), InfrastructureError> {
        self.set_with_expiry(key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, InfrastructureError> {
        RedisClient::set_if_absent(self, key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), InfrastructureError> {
        RedisClient::delete(self, key).await.map(|_| ())
    }
}

/// Whole seconds for `EX`, rounded up and never zero
pub(crate) fn expiry_seconds(ttl: Duration) -> u64 {
    let seconds = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    seconds.max(1)
}

/// TTL from a `PTTL` reply; negative replies mean no expiry or no key
pub(crate) fn remaining_ttl(pttl_ms: i64) -> Option<Duration> {
    u64::try_from(pttl_ms)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

/// Check if a Redis error is transient and the operation should be retried
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}
