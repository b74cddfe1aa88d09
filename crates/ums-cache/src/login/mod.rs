//! Login attempt tracking

mod attempt_store;

pub use attempt_store::{RedisLoginAttemptStore, ATTEMPTS_PREFIX, LOCK_PREFIX};
