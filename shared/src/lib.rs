//! Shared configuration and utilities for TokenKeeper
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration types for the cache tiers, credentials, token managers and logging
//! - Secret masking helpers for log output

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    CacheConfig, CredentialsConfig, Environment, LeaseConfig, LogFormat, LoggingConfig,
    ManagerConfig, TokenConfig,
};
pub use utils::mask;
