//! Configuration module
//!
//! - `cache` - Redis shared tier and fallback tier behaviour
//! - `credentials` - Application identity presented to the credential issuer
//! - `environment` - Environment detection and logging configuration
//! - `token` - Token freshness, issuer timeout and refresh lease settings

pub mod cache;
pub mod credentials;
pub mod environment;
pub mod token;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use cache::CacheConfig;
pub use credentials::CredentialsConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use token::{LeaseConfig, TokenConfig};

/// Complete configuration for a process hosting token managers
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ManagerConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Application credentials
    pub credentials: CredentialsConfig,

    /// Cache tier configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Token manager configuration
    #[serde(default)]
    pub token: TokenConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ManagerConfig {
    /// Load configuration from environment
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            credentials: CredentialsConfig::from_env(),
            cache: CacheConfig::from_env(),
            token: TokenConfig::from_env(),
            logging: LoggingConfig::from_env(environment),
        }
    }

    /// Check that the configuration can drive the token managers
    pub fn validate(&self) -> Result<(), String> {
        if !self.credentials.is_complete() {
            return Err("APP_ID and APP_SECRET must be set".to_string());
        }
        self.token.validate()
    }
}

/// Read and parse an environment variable, falling back to `default` when unset or invalid
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
