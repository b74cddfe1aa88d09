//! Ports for non-relational collaborators: login counters, notifications and
//! the media server.

use std::time::Duration;

use async_trait::async_trait;

use crate::entities::{ExpiryWarning, MediaUser};
use crate::traits::RepoResult;

/// Per-username failed login counters with TTL-bound lock markers
#[async_trait]
pub trait LoginAttemptStore: Send + Sync {
    /// Time left on the lock marker, if one is set
    async fn lock_ttl(&self, username: &str) -> RepoResult<Option<Duration>>;

    /// Current failure count (0 when absent)
    async fn attempts(&self, username: &str) -> RepoResult<u32>;

    /// Atomically increment the counter and (re)arm its TTL; returns the new count
    async fn increment(&self, username: &str, window: Duration) -> RepoResult<u32>;

    /// Atomically set the lock marker and remove the counter
    async fn lock(&self, username: &str, duration: Duration) -> RepoResult<()>;

    /// Remove the counter
    async fn clear(&self, username: &str) -> RepoResult<()>;
}

/// Outbound user notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_expiry_warning(&self, warning: &ExpiryWarning) -> RepoResult<()>;
}

/// Read access to the media server's account list
#[async_trait]
pub trait MediaUserDirectory: Send + Sync {
    async fn list_users(&self) -> RepoResult<Vec<MediaUser>>;
}
