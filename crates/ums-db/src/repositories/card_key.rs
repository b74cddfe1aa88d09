//! PostgreSQL implementation of CardKeyRepository

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use ums_core::entities::{CardKey, CardStatus, VipLevel};
use ums_core::error::DomainError;
use ums_core::traits::{CardKeyCounts, CardKeyFilter, CardKeyRepository, Redemption, RepoResult};
use ums_core::value_objects::CardKeyId;

use crate::mappers::card_keys_from_models;
use crate::models::{CardKeyModel, StatusCountModel};

use super::error::{map_db_error, map_unique_violation};

const CARD_KEY_COLUMNS: &str = "id, card_code, card_type, duration, status, used_by, used_at, \
                                expire_at, remark, created_by, created_at";

/// PostgreSQL implementation of CardKeyRepository
#[derive(Clone)]
pub struct PgCardKeyRepository {
    pool: PgPool,
}

impl PgCardKeyRepository {
    /// Create a new PgCardKeyRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards so a keyword matches literally
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Append the WHERE clause for a listing filter
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &CardKeyFilter) {
    builder.push(" WHERE TRUE");

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_i16());
    }

    if let Some(card_type) = filter.card_type {
        builder.push(" AND card_type = ").push_bind(card_type.as_i16());
    }

    let keyword = filter
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());
    if let Some(keyword) = keyword {
        let pattern = like_pattern(keyword);
        builder
            .push(" AND (card_code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR remark ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl CardKeyRepository for PgCardKeyRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: CardKeyId) -> RepoResult<Option<CardKey>> {
        let result = sqlx::query_as::<_, CardKeyModel>(&format!(
            "SELECT {CARD_KEY_COLUMNS} FROM card_keys WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(CardKey::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_code(&self, code: &str) -> RepoResult<Option<CardKey>> {
        let result = sqlx::query_as::<_, CardKeyModel>(&format!(
            "SELECT {CARD_KEY_COLUMNS} FROM card_keys WHERE card_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(CardKey::try_from).transpose()
    }

    #[instrument(skip(self, card_key), fields(code = %card_key.code))]
    async fn create(&self, card_key: &CardKey) -> RepoResult<CardKey> {
        let model = sqlx::query_as::<_, CardKeyModel>(&format!(
            r"
            INSERT INTO card_keys (card_code, card_type, duration, status, expire_at,
                                   remark, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CARD_KEY_COLUMNS}
            "
        ))
        .bind(&card_key.code)
        .bind(card_key.card_type.as_i16())
        .bind(card_key.duration_days)
        .bind(card_key.status.as_i16())
        .bind(card_key.expire_at)
        .bind(&card_key.remark)
        .bind(card_key.created_by.into_inner())
        .bind(card_key.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::CardCodeExists))?;

        CardKey::try_from(model)
    }

    #[instrument(skip(self, card_keys), fields(count = card_keys.len()))]
    async fn create_batch(&self, card_keys: &[CardKey]) -> RepoResult<Vec<CardKey>> {
        if card_keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO card_keys (card_code, card_type, duration, status, expire_at, \
             remark, created_by, created_at) ",
        );
        builder.push_values(card_keys, |mut row, key| {
            row.push_bind(&key.code)
                .push_bind(key.card_type.as_i16())
                .push_bind(key.duration_days)
                .push_bind(key.status.as_i16())
                .push_bind(key.expire_at)
                .push_bind(&key.remark)
                .push_bind(key.created_by.into_inner())
                .push_bind(key.created_at);
        });
        builder.push(" RETURNING ").push(CARD_KEY_COLUMNS);

        let models = builder
            .build_query_as::<CardKeyModel>()
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, || DomainError::CardCodeExists))?;

        tx.commit().await.map_err(map_db_error)?;

        debug!(inserted = models.len(), "Card key batch stored");
        card_keys_from_models(models)
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: CardKeyId, status: CardStatus) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE card_keys
            SET status = $2
            WHERE id = $1 AND status <> $3
            ",
        )
        .bind(id.into_inner())
        .bind(status.as_i16())
        .bind(CardStatus::Used.as_i16())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_unused(&self, id: CardKeyId) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM card_keys WHERE id = $1 AND status <> $2")
            .bind(id.into_inner())
            .bind(CardStatus::Used.as_i16())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn count_by_status(&self) -> RepoResult<CardKeyCounts> {
        let rows = sqlx::query_as::<_, StatusCountModel>(
            "SELECT status, COUNT(*) AS count FROM card_keys GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut counts = CardKeyCounts::default();
        for row in rows {
            match CardStatus::from_i16(row.status) {
                Some(CardStatus::Disabled) => counts.disabled = row.count,
                Some(CardStatus::Unused) => counts.unused = row.count,
                Some(CardStatus::Used) => counts.used = row.count,
                None => {
                    return Err(DomainError::DatabaseError(format!(
                        "unknown card status {}",
                        row.status
                    )))
                }
            }
        }

        Ok(counts)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &CardKeyFilter) -> RepoResult<(Vec<CardKey>, i64)> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM card_keys");
        push_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        let mut list_query = QueryBuilder::<Postgres>::new("SELECT ");
        list_query.push(CARD_KEY_COLUMNS).push(" FROM card_keys");
        push_filter(&mut list_query, filter);
        list_query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.page.limit)
            .push(" OFFSET ")
            .push_bind(filter.page.offset);

        let models = list_query
            .build_query_as::<CardKeyModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok((card_keys_from_models(models)?, total))
    }

    #[instrument(skip(self))]
    async fn redeem(&self, redemption: &Redemption) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Key first: whoever flips it from unused owns the redemption
        let key_result = sqlx::query(
            r"
            UPDATE card_keys
            SET status = $2, used_by = $3, used_at = $4
            WHERE id = $1 AND status = $5
            ",
        )
        .bind(redemption.card_key_id.into_inner())
        .bind(CardStatus::Used.as_i16())
        .bind(redemption.user_id.into_inner())
        .bind(redemption.redeemed_at)
        .bind(CardStatus::Unused.as_i16())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if key_result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_error)?;
            return Err(DomainError::RedemptionConflict);
        }

        // Compare-and-update against the expiry the new value was computed from
        let user_result = sqlx::query(
            r"
            UPDATE users
            SET vip_level = $2, vip_expire_at = $3, updated_at = $4
            WHERE user_id = $1 AND vip_expire_at IS NOT DISTINCT FROM $5
            ",
        )
        .bind(redemption.user_id.into_inner())
        .bind(VipLevel::Vip.as_i16())
        .bind(redemption.new_vip_expire_at)
        .bind(redemption.redeemed_at)
        .bind(redemption.previous_vip_expire_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if user_result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_error)?;
            return Err(DomainError::RedemptionConflict);
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }
}
