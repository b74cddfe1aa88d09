//! # ums-cache
//!
//! Redis layer: a managed connection pool and the per-username failed login
//! counters behind the login guard.
//!
//! ## Example
//!
//! ```ignore
//! use ums_cache::{RedisLoginAttemptStore, RedisPool, RedisPoolConfig};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let attempts = RedisLoginAttemptStore::new(pool.clone());
//! ```

pub mod login;
pub mod pool;

pub use login::{RedisLoginAttemptStore, ATTEMPTS_PREFIX, LOCK_PREFIX};
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};
