//! Integration tests wiring the token managers to the tiered cache store
//!
//! Each "process" gets its own `TieredCacheStore` (and therefore its own
//! fallback tier); they share only the shared tier, as separate hosts
//! sharing one Redis would.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use tk_core::errors::TokenError;
use tk_core::services::{AppTokenManager, UserTokenManager};
use tk_infra::TieredCacheStore;

fn process_store(shared: &Arc<InMemorySharedTier>) -> Arc<TieredCacheStore> {
    Arc::new(TieredCacheStore::with_shared_tier(
        shared.clone(),
        Duration::from_secs(5),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_issuer_called_once_across_processes() {
    let shared = Arc::new(InMemorySharedTier::default());
    let issuer = Arc::new(CountingIssuer::new(Duration::from_millis(150)));

    let managers: Vec<Arc<AppTokenManager>> = (0..3)
        .map(|_| {
            Arc::new(AppTokenManager::new(
                credentials(),
                process_store(&shared),
                issuer.clone(),
                token_config(),
            ))
        })
        .collect();

    let mut handles = Vec::new();
    for manager in &managers {
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.get_token().await }));
        }
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "t-integration-0001");
    }
    assert_eq!(issuer.app_calls(), 1);
    assert!(shared.raw("app:cli_integration").is_some());
    assert!(shared.raw("lock:app:cli_integration").is_none());
}

#[tokio::test]
async fn test_memory_only_store_still_serves_tokens() {
    let issuer = Arc::new(CountingIssuer::new(Duration::ZERO));
    let manager = AppTokenManager::new(
        credentials(),
        Arc::new(TieredCacheStore::memory_only()),
        issuer.clone(),
        token_config(),
    );

    let first = manager.get_token().await.unwrap();
    let second = manager.get_token().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(issuer.app_calls(), 1);
    assert!(manager.token_status().await.unwrap().is_usable);
}

#[tokio::test]
async fn test_user_tokens_visible_to_other_process() {
    let shared = Arc::new(InMemorySharedTier::default());
    let issuer = Arc::new(CountingIssuer::new(Duration::ZERO));
    let writer = UserTokenManager::new(credentials(), process_store(&shared), issuer.clone(), token_config());
    let reader = UserTokenManager::new(credentials(), process_store(&shared), issuer.clone(), token_config());

    writer
        .save_initial_tokens("ou_integration", "u-initial-access", "ur-initial-refresh", 7_200)
        .await
        .unwrap();

    assert_eq!(reader.get_token("ou_integration").await.unwrap(), "u-initial-access");
    assert_eq!(issuer.refresh_calls(), 0);
    assert!(matches!(
        reader.get_token("ou_unknown").await,
        Err(TokenError::ReauthorizationRequired { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_user_refresh_rotates_once_across_processes() {
    let shared = Arc::new(InMemorySharedTier::default());
    let issuer = Arc::new(CountingIssuer::new(Duration::from_millis(100)));
    let managers: Vec<Arc<UserTokenManager>> = (0..2)
        .map(|_| {
            Arc::new(UserTokenManager::new(
                credentials(),
                process_store(&shared),
                issuer.clone(),
                token_config(),
            ))
        })
        .collect();

    // Lifetime inside the buffer forces an immediate refresh
    managers[0]
        .save_initial_tokens("ou_rotating", "u-initial-access", "ur-initial-refresh", 10)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for manager in &managers {
        for _ in 0..6 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.get_token("ou_rotating").await }));
        }
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "u-integration-0001");
    }
    assert_eq!(issuer.refresh_calls(), 1);

    let raw = shared.raw("user:cli_integration:ou_rotating").unwrap();
    let record: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(record["refresh_token"], "ur-integration-0001");
}

#[tokio::test]
async fn test_user_token_served_while_shared_tier_down() {
    let shared = Arc::new(InMemorySharedTier::default());
    let issuer = Arc::new(CountingIssuer::new(Duration::ZERO));
    let manager = UserTokenManager::new(credentials(), process_store(&shared), issuer.clone(), token_config());
    manager
        .save_initial_tokens("ou_outage", "u-initial-access", "ur-initial-refresh", 7_200)
        .await
        .unwrap();

    shared.set_down(true);
    assert_eq!(manager.get_token("ou_outage").await.unwrap(), "u-initial-access");

    shared.set_down(false);
    assert_eq!(manager.get_token("ou_outage").await.unwrap(), "u-initial-access");
    assert_eq!(issuer.refresh_calls(), 0);
}

#[tokio::test]
async fn test_reader_process_keeps_serving_through_outage() {
    let shared = Arc::new(InMemorySharedTier::default());
    let issuer = Arc::new(CountingIssuer::new(Duration::ZERO));
    let writer = UserTokenManager::new(credentials(), process_store(&shared), issuer.clone(), token_config());
    let reader = UserTokenManager::new(credentials(), process_store(&shared), issuer.clone(), token_config());
    writer
        .save_initial_tokens("ou_reader", "u-initial-access", "ur-initial-refresh", 7_200)
        .await
        .unwrap();
    assert_eq!(reader.get_token("ou_reader").await.unwrap(), "u-initial-access");

    shared.set_down(true);

    assert_eq!(reader.get_token("ou_reader").await.unwrap(), "u-initial-access");
    assert!(reader.token_status("ou_reader").await.unwrap().is_usable);
    assert_eq!(issuer.refresh_calls(), 0);
}
