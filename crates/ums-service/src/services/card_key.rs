//! Card key service
//!
//! Batch generation, validation and redemption of card keys, and the
//! administrative disable/enable/delete operations.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};
use ums_core::entities::{
    AuditAction, AuditEntry, AuditStatus, CardKey, CardStatus, CardType, User,
};
use ums_core::traits::Redemption;
use ums_core::value_objects::{CardKeyId, UserId};
use ums_core::DomainError;
use validator::Validate;

use crate::dto::{
    Actor, BatchDeleteCardKeysRequest, CardKeyStatistics, CreateCardKeysRequest,
    ListCardKeysRequest, Page,
};

use super::context::ServiceContext;
use super::error::ServiceResult;

const AUDIT_TARGET: &str = "card_key";

/// Card key service
pub struct CardKeyService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CardKeyService<'a> {
    /// Create a new CardKeyService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Generate and store a batch of unused card keys
    ///
    /// All keys are stored in one transaction or none are.
    #[instrument(skip(self, actor, request), fields(actor = %actor.username, count = request.count))]
    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateCardKeysRequest,
    ) -> ServiceResult<Vec<CardKey>> {
        request.validate()?;

        let now = Utc::now();
        let remark = request.remark.unwrap_or_default();
        let keys: Vec<CardKey> = (0..request.count)
            .map(|_| {
                let key = CardKey::new(
                    request.card_type,
                    request.duration_days,
                    remark.clone(),
                    actor.user_id,
                    now,
                );
                match request.expire_at {
                    Some(expire_at) => key.with_expire_at(expire_at),
                    None => key,
                }
            })
            .collect();

        let created = self
            .ctx
            .store("card key batch insert", self.ctx.card_key_repo().create_batch(&keys))
            .await?;

        info!(
            count = created.len(),
            card_type = %request.card_type,
            duration_days = request.duration_days,
            "Card keys created"
        );

        self.audit(
            actor,
            AuditEntry::new(&actor.username, AuditAction::CardKeysCreated, AuditStatus::Success)
                .with_detail(json!({
                    "count": created.len(),
                    "card_type": request.card_type,
                    "duration_days": request.duration_days,
                })),
        )
        .await;

        Ok(created)
    }

    /// Redeem a VIP upgrade code for `user_id`, returning the updated user
    ///
    /// An active VIP is extended from its current expiry; otherwise the new
    /// period starts now. Key and user are written in one transaction.
    #[instrument(skip(self))]
    pub async fn redeem_vip_code(&self, code: &str, user_id: UserId) -> ServiceResult<User> {
        let now = Utc::now();
        let key = self.validate_vip_code(code).await?;

        let mut user = self
            .ctx
            .store("user lookup", self.ctx.user_repo().find_by_id(user_id))
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?;

        let new_expiry = user.next_vip_expiry(key.duration_days, now);
        let redemption = Redemption {
            card_key_id: key.id,
            user_id,
            redeemed_at: now,
            previous_vip_expire_at: user.vip_expire_at,
            new_vip_expire_at: new_expiry,
        };

        if let Err(e) = self
            .ctx
            .store("card key redemption", self.ctx.card_key_repo().redeem(&redemption))
            .await
        {
            warn!(card_key_id = %key.id, user_id = %user_id, error = %e, "Redemption failed");
            self.ctx
                .audit()
                .record(
                    AuditEntry::new(&user.username, AuditAction::CardKeyRedeemed, AuditStatus::Failed)
                        .with_user(user_id)
                        .with_target(AUDIT_TARGET, key.id)
                        .with_detail(json!({ "error": e.code() })),
                )
                .await;
            return Err(e.into());
        }

        let previous = user.vip_expire_at;
        user.grant_vip(new_expiry, now);

        info!(
            card_key_id = %key.id,
            user_id = %user_id,
            duration_days = key.duration_days,
            vip_expire_at = %new_expiry,
            "VIP code redeemed"
        );

        self.ctx
            .audit()
            .record(
                AuditEntry::new(&user.username, AuditAction::CardKeyRedeemed, AuditStatus::Success)
                    .with_user(user_id)
                    .with_target(AUDIT_TARGET, key.id)
                    .with_detail(json!({
                        "duration_days": key.duration_days,
                        "previous_expire_at": previous,
                        "vip_expire_at": new_expiry,
                    })),
            )
            .await;

        Ok(user)
    }

    /// Check that a code exists and is redeemable now, without using it
    ///
    /// Either card type passes; used for pre-registration checks.
    #[instrument(skip(self))]
    pub async fn validate_code(&self, code: &str) -> ServiceResult<CardKey> {
        let key = self.get_by_code(code).await?;
        key.ensure_redeemable(Utc::now())?;
        Ok(key)
    }

    /// Like [`validate_code`](Self::validate_code), additionally requiring a VIP upgrade code
    #[instrument(skip(self))]
    pub async fn validate_vip_code(&self, code: &str) -> ServiceResult<CardKey> {
        let key = self.validate_code(code).await?;
        key.ensure_type(CardType::VipUpgrade)?;
        Ok(key)
    }

    /// Disable an unused key (idempotent)
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn disable(&self, actor: &Actor, id: CardKeyId) -> ServiceResult<()> {
        self.set_status(actor, id, CardStatus::Disabled, "disabled", AuditAction::CardKeyDisabled)
            .await
    }

    /// Re-enable a disabled key (idempotent)
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn enable(&self, actor: &Actor, id: CardKeyId) -> ServiceResult<()> {
        self.set_status(actor, id, CardStatus::Unused, "enabled", AuditAction::CardKeyEnabled)
            .await
    }

    async fn set_status(
        &self,
        actor: &Actor,
        id: CardKeyId,
        status: CardStatus,
        action: &'static str,
        audit_action: AuditAction,
    ) -> ServiceResult<()> {
        let key = self.get(id).await?;
        key.ensure_modifiable(action)?;

        let updated = self
            .ctx
            .store("card key status update", self.ctx.card_key_repo().update_status(id, status))
            .await?;
        if !updated {
            return Err(self.missed_write(id, action).await.into());
        }

        info!(card_key_id = %id, status = %status, "Card key status changed");
        self.audit(
            actor,
            AuditEntry::new(&actor.username, audit_action, AuditStatus::Success)
                .with_target(AUDIT_TARGET, id)
                .with_detail(json!({ "code": key.code })),
        )
        .await;
        Ok(())
    }

    /// Permanently delete a key that has not been used
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn delete(&self, actor: &Actor, id: CardKeyId) -> ServiceResult<()> {
        let key = self.get(id).await?;
        key.ensure_modifiable("deleted")?;

        let deleted = self
            .ctx
            .store("card key delete", self.ctx.card_key_repo().delete_unused(id))
            .await?;
        if !deleted {
            return Err(self.missed_write(id, "deleted").await.into());
        }

        info!(card_key_id = %id, "Card key deleted");
        self.audit(
            actor,
            AuditEntry::new(&actor.username, AuditAction::CardKeyDeleted, AuditStatus::Success)
                .with_target(AUDIT_TARGET, id)
                .with_detail(json!({ "code": key.code })),
        )
        .await;
        Ok(())
    }

    /// Delete several keys; used and missing keys are skipped
    ///
    /// Returns the number of keys actually deleted.
    #[instrument(skip(self, actor, request), fields(actor = %actor.username, requested = request.ids.len()))]
    pub async fn batch_delete(
        &self,
        actor: &Actor,
        request: BatchDeleteCardKeysRequest,
    ) -> ServiceResult<u64> {
        request.validate()?;

        let mut deleted_ids = Vec::with_capacity(request.ids.len());
        for id in request.ids {
            let deleted = self
                .ctx
                .store("card key delete", self.ctx.card_key_repo().delete_unused(id))
                .await?;
            if deleted {
                deleted_ids.push(id);
            }
        }

        let deleted = deleted_ids.len() as u64;
        info!(deleted, "Card keys batch deleted");

        if deleted > 0 {
            self.audit(
                actor,
                AuditEntry::new(&actor.username, AuditAction::CardKeyDeleted, AuditStatus::Success)
                    .with_detail(json!({ "ids": deleted_ids })),
            )
            .await;
        }
        Ok(deleted)
    }

    /// Card keys matching a filter, newest first
    #[instrument(skip(self, request))]
    pub async fn list(&self, request: &ListCardKeysRequest) -> ServiceResult<Page<CardKey>> {
        request.validate()?;
        let filter = request.to_filter();
        let (items, total) = self
            .ctx
            .store("card key list", self.ctx.card_key_repo().list(&filter))
            .await?;
        Ok(Page { total, items })
    }

    /// Counts by status
    #[instrument(skip(self))]
    pub async fn statistics(&self) -> ServiceResult<CardKeyStatistics> {
        let counts = self
            .ctx
            .store("card key statistics", self.ctx.card_key_repo().count_by_status())
            .await?;
        Ok(counts.into())
    }

    /// Get a card key by ID
    #[instrument(skip(self))]
    pub async fn get(&self, id: CardKeyId) -> ServiceResult<CardKey> {
        let key = self
            .ctx
            .store("card key lookup", self.ctx.card_key_repo().find_by_id(id))
            .await?
            .ok_or(DomainError::CardKeyIdNotFound(id))?;
        Ok(key)
    }

    /// Get a card key by its code
    #[instrument(skip(self))]
    pub async fn get_by_code(&self, code: &str) -> ServiceResult<CardKey> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DomainError::CardKeyNotFound.into());
        }
        let key = self
            .ctx
            .store("card key lookup", self.ctx.card_key_repo().find_by_code(code))
            .await?
            .ok_or(DomainError::CardKeyNotFound)?;
        Ok(key)
    }

    /// Explain why a conditional write matched no row
    async fn missed_write(&self, id: CardKeyId, action: &'static str) -> DomainError {
        match self
            .ctx
            .store("card key lookup", self.ctx.card_key_repo().find_by_id(id))
            .await
        {
            Ok(Some(_)) => DomainError::CardKeyImmutable(action),
            Ok(None) => DomainError::CardKeyIdNotFound(id),
            Err(e) => e,
        }
    }

    async fn audit(&self, actor: &Actor, entry: AuditEntry) {
        self.ctx.audit().record(entry.with_user(actor.user_id)).await;
    }
}
