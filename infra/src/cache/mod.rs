//! Cache tiers behind the core `CacheStore` contract
//!
//! - `redis_client` - Redis shared tier with timeouts and retry
//! - `memory_cache` - in-process fallback tier
//! - `tiered_store` - the `CacheStore` combining both with failover

pub mod memory_cache;
pub mod redis_client;
pub mod shared_tier;
pub mod tiered_store;

#[cfg(test)]
mod tests;

pub use memory_cache::MemoryCache;
pub use redis_client::RedisClient;
pub use shared_tier::{SharedCacheTier, SharedEntry};
pub use tiered_store::TieredCacheStore;

// Re-export commonly used types
pub use tk_shared::config::CacheConfig;
