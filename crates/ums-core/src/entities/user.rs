//! User entity - the VIP-relevant view of an account

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// Role assigned to accounts that arrive without an explicit role (ordinary member)
pub const DEFAULT_MEMBER_ROLE_ID: i32 = 3;

/// Stored in place of a password hash for accounts that cannot log in locally
/// (imported from the media server). Never a valid PHC string.
pub const UNUSABLE_PASSWORD_HASH: &str = "!";

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Disabled,
    Active,
}

impl AccountStatus {
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Disabled => 0,
            Self::Active => 1,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Active),
            _ => None,
        }
    }
}

/// VIP level - a binary entitlement flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VipLevel {
    Standard,
    Vip,
}

impl VipLevel {
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Standard => 0,
            Self::Vip => 1,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Standard),
            1 => Some(Self::Vip),
            _ => None,
        }
    }
}

/// User account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub media_user_id: Option<String>,
    pub role_id: i32,
    pub status: AccountStatus,
    pub vip_level: VipLevel,
    pub vip_expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active standard member
    pub fn new(username: String, email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::default(),
            username,
            email,
            media_user_id: None,
            role_id: DEFAULT_MEMBER_ROLE_ID,
            status: AccountStatus::Active,
            vip_level: VipLevel::Standard,
            vip_expire_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Link the account to a media server user
    pub fn with_media_user_id(mut self, media_user_id: impl Into<String>) -> Self {
        self.media_user_id = Some(media_user_id.into());
        self
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Whether the VIP entitlement is in force at `now`
    pub fn has_active_vip(&self, now: DateTime<Utc>) -> bool {
        self.vip_level == VipLevel::Vip && self.vip_expire_at.is_some_and(|at| at > now)
    }

    /// Expiry after adding `days` of VIP time
    ///
    /// A still-running expiry is extended from its current value; a missing
    /// or lapsed one restarts from `now`.
    pub fn next_vip_expiry(&self, days: i32, now: DateTime<Utc>) -> DateTime<Utc> {
        let base = match self.vip_expire_at {
            Some(current) if current > now => current,
            _ => now,
        };
        base + Duration::days(i64::from(days))
    }

    /// Apply a VIP grant ending at `expire_at`
    pub fn grant_vip(&mut self, expire_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.vip_level = VipLevel::Vip;
        self.vip_expire_at = Some(expire_at);
        self.updated_at = now;
    }

    /// Drop back to standard level; the expiry timestamp is kept for history
    pub fn demote(&mut self, now: DateTime<Utc>) {
        self.vip_level = VipLevel::Standard;
        self.updated_at = now;
    }

    /// Whole days left on the VIP entitlement, never less than 1
    ///
    /// Returns `None` when there is no future expiry.
    pub fn days_until_vip_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        let expire_at = self.vip_expire_at.filter(|at| *at > now)?;
        Some((expire_at - now).num_days().max(1))
    }

    /// Address usable for notifications, if any
    pub fn contact_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}
