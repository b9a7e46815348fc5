//! Token managers
//!
//! Both managers follow the same cache-aside flow: serve a cached record while
//! it is outside the buffer window, otherwise take the per-key lease, re-check
//! and call the issuer at most once.

mod app_manager;
mod coordinator;
mod user_manager;


pub use app_manager::AppTokenManager;
pub use user_manager::UserTokenManager;
