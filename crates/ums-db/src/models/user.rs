//! User database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for users table
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub user_id: i64,
    pub username: String,
    pub email: Option<String>,
    pub emby_user_id: Option<String>,
    pub role_id: i32,
    pub status: i16,
    pub vip_level: i16,
    pub vip_expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
