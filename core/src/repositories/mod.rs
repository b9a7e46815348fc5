pub mod cache;

pub use cache::{CacheStore, StoreTier};

#[cfg(test)]
pub use cache::MockCacheStore;
