//! PostgreSQL implementations of the audit log and access record repositories

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use ums_core::entities::AuditEntry;
use ums_core::traits::{AccessRecordRepository, AuditLogRepository, RepoResult};

use super::error::map_db_error;

/// PostgreSQL implementation of AuditLogRepository
#[derive(Clone)]
pub struct PgAuditLogRepository {
    pool: PgPool,
}

impl PgAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    #[instrument(skip(self, entry), fields(action = %entry.action))]
    async fn create(&self, entry: &AuditEntry) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO audit_logs (user_id, username, action, target_type, target_id,
                                    detail, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(entry.user_id.map(i64::from))
        .bind(&entry.username)
        .bind(entry.action.as_str())
        .bind(entry.target_type.as_deref())
        .bind(entry.target_id.as_deref())
        .bind(&entry.detail)
        .bind(entry.status.as_str())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}

/// PostgreSQL implementation of AccessRecordRepository
#[derive(Clone)]
pub struct PgAccessRecordRepository {
    pool: PgPool,
}

impl PgAccessRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessRecordRepository for PgAccessRecordRepository {
    #[instrument(skip(self))]
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM access_records WHERE access_time < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
