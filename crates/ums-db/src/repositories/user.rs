//! PostgreSQL implementation of UserRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use ums_core::entities::{User, VipLevel};
use ums_core::error::DomainError;
use ums_core::traits::{PageRequest, RepoResult, UserRepository};
use ums_core::value_objects::UserId;

use crate::mappers::users_from_models;
use crate::models::UserModel;

use super::error::{map_db_error, map_unique_violation, user_not_found};

const USER_COLUMNS: &str = "user_id, username, email, emby_user_id, role_id, status, vip_level, \
                            vip_expire_at, created_at, updated_at";

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(User::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.find_one("username", username).await
    }

    #[instrument(skip(self))]
    async fn find_by_media_user_id(&self, media_user_id: &str) -> RepoResult<Option<User>> {
        self.find_one("emby_user_id", media_user_id).await
    }

    #[instrument(skip(self, user, password_hash), fields(username = %user.username))]
    async fn create(&self, user: &User, password_hash: &str) -> RepoResult<User> {
        let model = sqlx::query_as::<_, UserModel>(&format!(
            r"
            INSERT INTO users (username, password_hash, email, emby_user_id, role_id, status,
                               vip_level, vip_expire_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&user.username)
        .bind(password_hash)
        .bind(user.email.as_deref())
        .bind(user.media_user_id.as_deref())
        .bind(user.role_id)
        .bind(user.status.as_i16())
        .bind(user.vip_level.as_i16())
        .bind(user.vip_expire_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::UsernameExists))?;

        User::try_from(model)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: &User) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET email = $2, emby_user_id = $3, role_id = $4, status = $5,
                vip_level = $6, vip_expire_at = $7, updated_at = NOW()
            WHERE user_id = $1
            ",
        )
        .bind(user.id.into_inner())
        .bind(user.email.as_deref())
        .bind(user.media_user_id.as_deref())
        .bind(user.role_id)
        .bind(user.status.as_i16())
        .bind(user.vip_level.as_i16())
        .bind(user.vip_expire_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(user.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn link_media_user(&self, id: UserId, media_user_id: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET emby_user_id = $2, updated_at = NOW()
            WHERE user_id = $1 AND emby_user_id IS NULL
            ",
        )
        .bind(id.into_inner())
        .bind(media_user_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn get_password_hash(&self, id: UserId) -> RepoResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE user_id = $1")
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn bulk_demote_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET vip_level = $2, updated_at = $1
            WHERE vip_level = $3
              AND vip_expire_at IS NOT NULL
              AND vip_expire_at < $1
            ",
        )
        .bind(now)
        .bind(VipLevel::Standard.as_i16())
        .bind(VipLevel::Vip.as_i16())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn count_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM users
            WHERE vip_level = $3 AND vip_expire_at > $1 AND vip_expire_at <= $2
            ",
        )
        .bind(from)
        .bind(to)
        .bind(VipLevel::Vip.as_i16())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn list_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: PageRequest,
    ) -> RepoResult<Vec<User>> {
        let models = sqlx::query_as::<_, UserModel>(&format!(
            r"
            SELECT {USER_COLUMNS} FROM users
            WHERE vip_level = $3 AND vip_expire_at > $1 AND vip_expire_at <= $2
            ORDER BY vip_expire_at ASC, user_id ASC
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(from)
        .bind(to)
        .bind(VipLevel::Vip.as_i16())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        users_from_models(models)
    }

    #[instrument(skip(self))]
    async fn list_expired_ids(
        &self,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> RepoResult<Vec<UserId>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r"
            SELECT user_id FROM users
            WHERE vip_level = $2 AND vip_expire_at IS NOT NULL AND vip_expire_at < $1
            ORDER BY user_id ASC
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(now)
        .bind(VipLevel::Vip.as_i16())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }

    #[instrument(skip(self))]
    async fn count_active_vip(&self, now: DateTime<Utc>) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE vip_level = $2 AND vip_expire_at > $1",
        )
        .bind(now)
        .bind(VipLevel::Vip.as_i16())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }
}
