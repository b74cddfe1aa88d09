//! Card key database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for card_keys table
#[derive(Debug, Clone, FromRow)]
pub struct CardKeyModel {
    pub id: i64,
    pub card_code: String,
    pub card_type: i16,
    pub duration: i32,
    pub status: i16,
    pub used_by: Option<i64>,
    pub used_at: Option<DateTime<Utc>>,
    pub expire_at: Option<DateTime<Utc>>,
    pub remark: String,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// One row of `SELECT status, COUNT(*) ... GROUP BY status`
#[derive(Debug, Clone, Copy, FromRow)]
pub struct StatusCountModel {
    pub status: i16,
    pub count: i64,
}
