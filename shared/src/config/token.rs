//! Token manager and lease configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::env_or;

/// Freshness and timeout settings shared by the app and user token managers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Safety margin subtracted from a token's expiry before it is considered usable
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: u64,

    /// Upper bound for a single issuer call
    #[serde(default = "default_issuer_timeout")]
    pub issuer_timeout_seconds: u64,

    /// Cache TTL of a user record; the refresh secret outlives the access token
    #[serde(default = "default_user_record_ttl")]
    pub user_record_ttl_seconds: u64,

    /// Refresh lease settings
    #[serde(default)]
    pub lease: LeaseConfig,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            buffer_seconds: default_buffer_seconds(),
            issuer_timeout_seconds: default_issuer_timeout(),
            user_record_ttl_seconds: default_user_record_ttl(),
            lease: LeaseConfig::default(),
        }
    }
}

impl TokenConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            buffer_seconds: env_or("TOKEN_BUFFER_SECONDS", default_buffer_seconds()),
            issuer_timeout_seconds: env_or("ISSUER_TIMEOUT_SECONDS", default_issuer_timeout()),
            user_record_ttl_seconds: env_or("USER_RECORD_TTL_SECONDS", default_user_record_ttl()),
            lease: LeaseConfig::from_env(),
        }
    }

    pub fn buffer(&self) -> Duration {
        Duration::from_secs(self.buffer_seconds)
    }

    pub fn issuer_timeout(&self) -> Duration {
        Duration::from_secs(self.issuer_timeout_seconds)
    }

    pub fn user_record_ttl(&self) -> Duration {
        Duration::from_secs(self.user_record_ttl_seconds)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), String> {
        if self.issuer_timeout_seconds == 0 {
            return Err("issuer_timeout_seconds must be greater than zero".to_string());
        }
        if self.issuer_timeout_seconds >= self.lease.ttl_seconds {
            return Err(format!(
                "issuer_timeout_seconds ({}) must be shorter than lease.ttl_seconds ({})",
                self.issuer_timeout_seconds, self.lease.ttl_seconds
            ));
        }
        if self.user_record_ttl_seconds <= self.buffer_seconds {
            return Err(format!(
                "user_record_ttl_seconds ({}) must exceed buffer_seconds ({})",
                self.user_record_ttl_seconds, self.buffer_seconds
            ));
        }
        self.lease.validate()
    }
}

/// Refresh lease settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeaseConfig {
    /// Lease TTL; bounds how long a refresh may hold the critical section
    #[serde(default = "default_lease_ttl")]
    pub ttl_seconds: u64,

    /// Maximum total time a caller waits for a lease held elsewhere
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Maximum acquisition attempts while waiting
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay between acquisition attempts
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff cap
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// On wait timeout, hand out a token that is inside the buffer window but not yet expired
    #[serde(default)]
    pub serve_stale_on_timeout: bool,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_lease_ttl(),
            max_wait_ms: default_max_wait_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            serve_stale_on_timeout: false,
        }
    }
}

impl LeaseConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            ttl_seconds: env_or("LEASE_TTL_SECONDS", default_lease_ttl()),
            max_wait_ms: env_or("LEASE_MAX_WAIT_MS", default_max_wait_ms()),
            max_attempts: env_or("LEASE_MAX_ATTEMPTS", default_max_attempts()),
            initial_backoff_ms: env_or("LEASE_INITIAL_BACKOFF_MS", default_initial_backoff_ms()),
            max_backoff_ms: env_or("LEASE_MAX_BACKOFF_MS", default_max_backoff_ms()),
            serve_stale_on_timeout: env_or("LEASE_SERVE_STALE_ON_TIMEOUT", false),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ttl_seconds == 0 {
            return Err("lease.ttl_seconds must be greater than zero".to_string());
        }
        if self.max_attempts == 0 {
            return Err("lease.max_attempts must be greater than zero".to_string());
        }
        if self.initial_backoff_ms == 0 || self.initial_backoff_ms > self.max_backoff_ms {
            return Err(format!(
                "lease backoff must satisfy 0 < initial ({}) <= max ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            ));
        }
        Ok(())
    }
}

fn default_buffer_seconds() -> u64 {
    300 // 5 minutes
}

fn default_issuer_timeout() -> u64 {
    5
}

fn default_user_record_ttl() -> u64 {
    30 * 24 * 60 * 60 // 30 days
}

fn default_lease_ttl() -> u64 {
    10
}

fn default_max_wait_ms() -> u64 {
    8_000
}

fn default_max_attempts() -> u32 {
    40
}

fn default_initial_backoff_ms() -> u64 {
    50
}

fn default_max_backoff_ms() -> u64 {
    800
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TokenConfig::default();
        assert_eq!(config.buffer(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_issuer_timeout_must_fit_in_lease() {
        let mut config = TokenConfig::default();
        config.issuer_timeout_seconds = config.lease.ttl_seconds;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lease_backoff_bounds() {
        let lease = LeaseConfig {
            initial_backoff_ms: 900,
            max_backoff_ms: 100,
            ..Default::default()
        };
        assert!(lease.validate().is_err());
    }

    #[test]
    fn test_user_record_ttl_exceeds_buffer() {
        let config = TokenConfig {
            user_record_ttl_seconds: 60,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
