//! Authentication service
//!
//! Username/password login guarded by the failed-attempt lockout.

use serde_json::json;
use tracing::{info, instrument, warn};
use ums_common::verify_password;
use ums_core::entities::{AuditAction, AuditEntry, AuditStatus, User};
use ums_core::DomainError;

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::login_guard::{FailureOutcome, LoginGuard};

/// Authentication service
pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Log in with username and password, returning the account
    ///
    /// A locked username is rejected before any lookup. Unknown usernames
    /// and wrong passwords both count as failures and yield the same error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<User> {
        let guard = LoginGuard::new(self.ctx);

        if let Some(remaining) = guard.is_locked(username).await? {
            warn!("Login rejected: account locked");
            return Err(DomainError::AccountLocked {
                remaining_secs: remaining.as_secs(),
            }
            .into());
        }

        let user = self
            .ctx
            .store("user lookup", self.ctx.user_repo().find_by_username(username))
            .await?;

        let Some(user) = user else {
            warn!("Login failed: user not found");
            self.record_failure(&guard, username, None, "unknown user").await?;
            return Err(DomainError::InvalidCredentials.into());
        };

        if !user.is_active() {
            warn!(user_id = %user.id, "Login failed: account disabled");
            return Err(DomainError::AccountDisabled.into());
        }

        let hash = self
            .ctx
            .store("password lookup", self.ctx.user_repo().get_password_hash(user.id))
            .await?
            .unwrap_or_default();

        if !verify_password(password, &hash) {
            warn!(user_id = %user.id, "Login failed: invalid password");
            self.record_failure(&guard, username, Some(&user), "wrong password")
                .await?;
            return Err(DomainError::InvalidCredentials.into());
        }

        guard.clear(username).await?;

        info!(user_id = %user.id, "User logged in");
        self.ctx
            .audit()
            .record(
                AuditEntry::new(&user.username, AuditAction::Login, AuditStatus::Success)
                    .with_user(user.id),
            )
            .await;

        Ok(user)
    }

    async fn record_failure(
        &self,
        guard: &LoginGuard<'_>,
        username: &str,
        user: Option<&User>,
        reason: &str,
    ) -> ServiceResult<()> {
        let outcome = guard.record_failure(username).await?;

        let (action, detail) = match outcome {
            FailureOutcome::Counted { attempts, remaining } => (
                AuditAction::LoginFailed,
                json!({ "reason": reason, "attempts": attempts, "remaining": remaining }),
            ),
            FailureOutcome::LockedOut(duration) => (
                AuditAction::AccountLocked,
                json!({ "reason": reason, "lock_secs": duration.as_secs() }),
            ),
        };

        let mut entry = AuditEntry::new(username, action, AuditStatus::Failed).with_detail(detail);
        if let Some(user) = user {
            entry = entry.with_user(user.id);
        }
        self.ctx.audit().record(entry).await;
        Ok(())
    }
}
