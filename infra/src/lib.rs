//! # Infrastructure Layer
//!
//! Concrete implementations behind the core crate's contracts:
//!
//! - **Cache**: Redis shared tier, in-process fallback tier and the tiered
//!   [`CacheStore`](tk_core::repositories::CacheStore) built from both
//! - **Telemetry**: `tracing` subscriber setup
//! - **Configuration**: `.env` + environment loading

pub mod cache;
pub mod telemetry;

use tk_shared::config::ManagerConfig;

pub use cache::{MemoryCache, RedisClient, SharedCacheTier, SharedEntry, TieredCacheStore};
pub use telemetry::init_tracing;

/// Load and validate the manager configuration
///
/// Reads an optional `.env` file into the process environment first;
/// variables already set take precedence.
pub fn load_config() -> Result<ManagerConfig, InfrastructureError> {
    dotenvy::dotenv().ok(); // Load .env file if present

    let config = ManagerConfig::from_env();
    config.validate().map_err(InfrastructureError::Config)?;

    tracing::debug!(
        environment = %config.environment,
        app_id = %config.credentials.app_id,
        redis_url = %tk_shared::utils::mask_url(&config.cache.url),
        "Configuration loaded"
    );
    Ok(config)
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// A shared-tier operation exceeded its response timeout
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}
