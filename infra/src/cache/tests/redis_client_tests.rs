//! Unit tests for Redis client

use redis::{ErrorKind, RedisError};
use std::time::Duration;

use crate::cache::redis_client::{expiry_seconds, is_retriable_error, remaining_ttl, RedisClient};
use crate::InfrastructureError;
use tk_shared::config::CacheConfig;

#[test]
fn test_is_retriable_error() {
    // IO errors should be retriable
    let io_error = RedisError::from(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "Connection refused",
    ));
    assert!(is_retriable_error(&io_error));

    // Parse errors should not be retriable
    let parse_error = RedisError::from((ErrorKind::TypeError, "Invalid type"));
    assert!(!is_retriable_error(&parse_error));
}

#[test]
fn test_expiry_seconds_rounds_up() {
    assert_eq!(expiry_seconds(Duration::from_secs(7_200)), 7_200);
    assert_eq!(expiry_seconds(Duration::from_millis(1_500)), 2);
    assert_eq!(expiry_seconds(Duration::ZERO), 1);
}

#[test]
fn test_remaining_ttl_from_pttl_reply() {
    assert_eq!(remaining_ttl(59_500), Some(Duration::from_millis(59_500)));
    // -1: key without expiry, -2: missing key
    assert_eq!(remaining_ttl(-1), None);
    assert_eq!(remaining_ttl(-2), None);
    assert_eq!(remaining_ttl(0), None);
}

#[tokio::test]
async fn test_client_creation_with_invalid_url() {
    let config = CacheConfig::new("invalid://url");

    let result = RedisClient::new(config).await;
    assert!(matches!(result, Err(InfrastructureError::Config(_))));
}

#[tokio::test]
#[ignore] // Requires actual Redis server
async fn test_basic_operations() {
    let config = CacheConfig::new(
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
    )
    .with_prefix("tk_test");

    let client = RedisClient::new(config).await.unwrap();
    assert!(client.health_check().await.unwrap());

    let key = "unit:basic";
    client.delete(key).await.unwrap();

    client
        .set_with_expiry(key, "value", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(client.get(key).await.unwrap(), Some("value".to_string()));
    let entry = client.get_with_ttl(key).await.unwrap().unwrap();
    assert_eq!(entry.value, "value");
    assert!(entry.ttl.is_some_and(|ttl| ttl <= Duration::from_secs(60)));

    assert!(!client
        .set_if_absent(key, "other", Duration::from_secs(60))
        .await
        .unwrap());
    assert!(client.delete(key).await.unwrap());
    assert!(client
        .set_if_absent(key, "other", Duration::from_secs(60))
        .await
        .unwrap());

    client.delete(key).await.unwrap();
    assert_eq!(client.get(key).await.unwrap(), None);
}
