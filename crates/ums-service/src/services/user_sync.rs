//! Media server user sync
//!
//! Imports accounts from the media server. For each remote user:
//! already linked by media ID -> skip; a local user with the same name and
//! no link -> link it; otherwise create a local member that cannot log in
//! with a password until one is set.

use serde_json::json;
use tracing::{info, instrument, warn};
use ums_core::entities::{AuditAction, AuditEntry, AuditStatus, MediaUser, User};
use ums_core::UNUSABLE_PASSWORD_HASH;

use crate::dto::UserSyncReport;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Username recorded on audit entries written by background jobs
pub const SYSTEM_ACTOR: &str = "system";

enum SyncAction {
    Unchanged,
    Linked,
    Created,
}

/// User sync service
pub struct UserSyncService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UserSyncService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Fetch the media server user list and reconcile local accounts
    ///
    /// Per-user failures are logged and counted; only a failed fetch fails
    /// the run.
    #[instrument(skip(self))]
    pub async fn run(&self) -> ServiceResult<UserSyncReport> {
        let directory = self
            .ctx
            .media_directory()
            .ok_or_else(|| ServiceError::validation("media server is not configured"))?;

        let remote = self
            .ctx
            .external("media server user list", directory.list_users())
            .await?;

        let mut report = UserSyncReport {
            fetched: remote.len(),
            ..Default::default()
        };

        for media_user in &remote {
            match self.sync_one(media_user).await {
                Ok(SyncAction::Unchanged) => {}
                Ok(SyncAction::Linked) => report.linked += 1,
                Ok(SyncAction::Created) => report.created += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(media_user = %media_user.name, error = %e, "User sync failed");
                }
            }
        }

        if report.synced() > 0 {
            self.ctx
                .audit()
                .record(
                    AuditEntry::new(SYSTEM_ACTOR, AuditAction::UserSynced, AuditStatus::Success)
                        .with_detail(json!({
                            "fetched": report.fetched,
                            "created": report.created,
                            "linked": report.linked,
                            "failed": report.failed,
                        })),
                )
                .await;
        }

        info!(
            fetched = report.fetched,
            created = report.created,
            linked = report.linked,
            failed = report.failed,
            "Media server user sync completed"
        );
        Ok(report)
    }

    async fn sync_one(&self, media_user: &MediaUser) -> ServiceResult<SyncAction> {
        let repo = self.ctx.user_repo();

        if self
            .ctx
            .store("user lookup", repo.find_by_media_user_id(&media_user.id))
            .await?
            .is_some()
        {
            return Ok(SyncAction::Unchanged);
        }

        if let Some(existing) = self
            .ctx
            .store("user lookup", repo.find_by_username(&media_user.name))
            .await?
        {
            if existing.media_user_id.is_some() {
                return Ok(SyncAction::Unchanged);
            }
            // Only the link column is written; VIP fields belong to redemption
            let linked = self
                .ctx
                .store("user link", repo.link_media_user(existing.id, &media_user.id))
                .await?;
            return Ok(if linked {
                SyncAction::Linked
            } else {
                SyncAction::Unchanged
            });
        }

        let user = User::new(media_user.name.clone(), None).with_media_user_id(&media_user.id);
        self.ctx
            .store("user create", repo.create(&user, UNUSABLE_PASSWORD_HASH))
            .await?;
        Ok(SyncAction::Created)
    }
}
