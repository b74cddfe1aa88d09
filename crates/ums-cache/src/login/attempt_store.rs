//! Failed login counters and lock markers in Redis.
//!
//! Two keys per username:
//! - `ums:login:attempts:{username}` - failure counter with a sliding TTL
//! - `ums:login:lock:{username}` - lock marker, present while locked out
//!
//! Both expire on their own, so a crashed process never leaves a user locked.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::instrument;
use ums_core::traits::{LoginAttemptStore, RepoResult};

use crate::pool::{RedisPool, RedisPoolError};

/// Key prefix for failure counters
pub const ATTEMPTS_PREFIX: &str = "ums:login:attempts:";

/// Key prefix for lock markers
pub const LOCK_PREFIX: &str = "ums:login:lock:";

/// Redis-backed `LoginAttemptStore`
#[derive(Clone, Debug)]
pub struct RedisLoginAttemptStore {
    pool: RedisPool,
}

impl RedisLoginAttemptStore {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn attempts_key(username: &str) -> String {
        format!("{ATTEMPTS_PREFIX}{username}")
    }

    fn lock_key(username: &str) -> String {
        format!("{LOCK_PREFIX}{username}")
    }
}

/// Whole seconds for a Redis TTL argument, never zero
fn ttl_secs(duration: Duration) -> u64 {
    duration.as_secs().max(1)
}

#[async_trait]
impl LoginAttemptStore for RedisLoginAttemptStore {
    #[instrument(skip(self))]
    async fn lock_ttl(&self, username: &str) -> RepoResult<Option<Duration>> {
        let mut conn = self.pool.get().await?;
        let ttl: i64 = conn
            .ttl(Self::lock_key(username))
            .await
            .map_err(RedisPoolError::from)?;

        // -2: no key; -1: key without expiry (never written by us)
        Ok(match ttl {
            -2 => None,
            secs => Some(Duration::from_secs(u64::try_from(secs).unwrap_or(0))),
        })
    }

    #[instrument(skip(self))]
    async fn attempts(&self, username: &str) -> RepoResult<u32> {
        let mut conn = self.pool.get().await?;
        let count: Option<u32> = conn
            .get(Self::attempts_key(username))
            .await
            .map_err(RedisPoolError::from)?;
        Ok(count.unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn increment(&self, username: &str, window: Duration) -> RepoResult<u32> {
        let key = Self::attempts_key(username);
        let window_secs = i64::try_from(ttl_secs(window)).unwrap_or(i64::MAX);

        let mut conn = self.pool.get().await?;
        let (count,): (u32,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .expire(&key, window_secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn lock(&self, username: &str, duration: Duration) -> RepoResult<()> {
        let mut conn = self.pool.get().await?;
        redis::pipe()
            .atomic()
            .set_ex(Self::lock_key(username), 1, ttl_secs(duration))
            .ignore()
            .del(Self::attempts_key(username))
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self, username: &str) -> RepoResult<()> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(Self::attempts_key(username))
            .await
            .map_err(RedisPoolError::from)?;
        Ok(())
    }
}
