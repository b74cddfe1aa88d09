//! Login guard
//!
//! Per-username failure counting with temporary lockout:
//! `Clear -> Counting(n) -> Locked -> (TTL) -> Clear`.
//! Counter and lock live in the [`LoginAttemptStore`](ums_core::traits::LoginAttemptStore)
//! and expire on their own.

use std::time::Duration;

use tracing::{instrument, warn};
use ums_core::DomainError;

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Result of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Below the threshold; `remaining` more failures trigger the lock
    Counted { attempts: u32, remaining: u32 },
    /// This failure reached the threshold; the account is locked for the duration
    LockedOut(Duration),
}

/// Observable guard state for a username
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Clear,
    Counting(u32),
    Locked(Duration),
}

/// Login guard service
pub struct LoginGuard<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> LoginGuard<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Time left on the lock, if locked
    #[instrument(skip(self))]
    pub async fn is_locked(&self, username: &str) -> ServiceResult<Option<Duration>> {
        let remaining = self
            .ctx
            .store("login lock check", self.ctx.login_attempts().lock_ttl(username))
            .await?;
        Ok(remaining)
    }

    /// Record a failed attempt
    ///
    /// While locked nothing is counted and `AccountLocked` is returned.
    #[instrument(skip(self))]
    pub async fn record_failure(&self, username: &str) -> ServiceResult<FailureOutcome> {
        if let Some(remaining) = self.is_locked(username).await? {
            return Err(DomainError::AccountLocked {
                remaining_secs: remaining.as_secs(),
            }
            .into());
        }

        let config = self.ctx.login_guard_config();
        let attempts = self
            .ctx
            .store(
                "login attempt increment",
                self.ctx
                    .login_attempts()
                    .increment(username, config.attempt_window),
            )
            .await?;

        if attempts >= config.max_attempts {
            self.ctx
                .store(
                    "login lock",
                    self.ctx.login_attempts().lock(username, config.lock_duration),
                )
                .await?;
            warn!(
                attempts,
                lock_secs = config.lock_duration.as_secs(),
                "Too many failed logins, account locked"
            );
            return Ok(FailureOutcome::LockedOut(config.lock_duration));
        }

        Ok(FailureOutcome::Counted {
            attempts,
            remaining: config.max_attempts - attempts,
        })
    }

    /// Forget failed attempts (after a successful login)
    #[instrument(skip(self))]
    pub async fn clear(&self, username: &str) -> ServiceResult<()> {
        self.ctx
            .store("login attempt reset", self.ctx.login_attempts().clear(username))
            .await?;
        Ok(())
    }

    /// Current state for `username`
    #[instrument(skip(self))]
    pub async fn state(&self, username: &str) -> ServiceResult<LoginState> {
        if let Some(remaining) = self.is_locked(username).await? {
            return Ok(LoginState::Locked(remaining));
        }
        let attempts = self
            .ctx
            .store("login attempt count", self.ctx.login_attempts().attempts(username))
            .await?;
        Ok(match attempts {
            0 => LoginState::Clear,
            n => LoginState::Counting(n),
        })
    }
}
