//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{AuditEntry, CardKey, CardStatus, CardType, User};
use crate::error::DomainError;
use crate::value_objects::{CardKeyId, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

/// Largest page a listing may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Offset pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub const fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Build from a 1-based page number, clamping the page size to `1..=MAX_PAGE_SIZE`
    pub fn from_page(page: i64, page_size: i64) -> Self {
        let limit = page_size.clamp(1, MAX_PAGE_SIZE);
        let page = page.max(1);
        Self {
            limit,
            offset: (page - 1) * limit,
        }
    }

    /// The page following this one
    pub const fn next(self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::from_page(1, 20)
    }
}

// ============================================================================
// Card Key Repository
// ============================================================================

/// Filter for card key listings
#[derive(Debug, Clone, Default)]
pub struct CardKeyFilter {
    pub status: Option<CardStatus>,
    pub card_type: Option<CardType>,
    /// Substring matched against code and remark
    pub keyword: Option<String>,
    pub page: PageRequest,
}

/// Number of card keys per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardKeyCounts {
    pub disabled: i64,
    pub unused: i64,
    pub used: i64,
}

impl CardKeyCounts {
    pub const fn total(&self) -> i64 {
        self.disabled + self.unused + self.used
    }
}

/// Both writes of a VIP code redemption
///
/// `previous_vip_expire_at` is the value read before computing the new
/// expiry; the user write only applies while it is still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    pub card_key_id: CardKeyId,
    pub user_id: UserId,
    pub redeemed_at: DateTime<Utc>,
    pub previous_vip_expire_at: Option<DateTime<Utc>>,
    pub new_vip_expire_at: DateTime<Utc>,
}

#[async_trait]
pub trait CardKeyRepository: Send + Sync {
    /// Find card key by ID
    async fn find_by_id(&self, id: CardKeyId) -> RepoResult<Option<CardKey>>;

    /// Find card key by its code
    async fn find_by_code(&self, code: &str) -> RepoResult<Option<CardKey>>;

    /// Insert a single card key, returning it with its assigned ID
    async fn create(&self, card_key: &CardKey) -> RepoResult<CardKey>;

    /// Insert all card keys in one transaction; nothing is stored on failure
    async fn create_batch(&self, card_keys: &[CardKey]) -> RepoResult<Vec<CardKey>>;

    /// Set status on a key that is not used. Returns false when no unused or
    /// disabled key with this ID exists.
    async fn update_status(&self, id: CardKeyId, status: CardStatus) -> RepoResult<bool>;

    /// Delete a key that is not used. Returns false when nothing was deleted.
    async fn delete_unused(&self, id: CardKeyId) -> RepoResult<bool>;

    /// Count keys grouped by status
    async fn count_by_status(&self) -> RepoResult<CardKeyCounts>;

    /// List keys, newest first, with the total matching count
    async fn list(&self, filter: &CardKeyFilter) -> RepoResult<(Vec<CardKey>, i64)>;

    /// Mark the key used and extend the user's VIP in one transaction
    ///
    /// Fails with `RedemptionConflict` when the key is no longer unused or the
    /// user's expiry changed since it was read; neither write is kept then.
    async fn redeem(&self, redemption: &Redemption) -> RepoResult<()>;
}

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    /// Find the user linked to a media server account
    async fn find_by_media_user_id(&self, media_user_id: &str) -> RepoResult<Option<User>>;

    /// Create a new user, returning it with its assigned ID
    async fn create(&self, user: &User, password_hash: &str) -> RepoResult<User>;

    /// Update an existing user
    async fn update(&self, user: &User) -> RepoResult<()>;

    /// Attach a media server account to a user that has none yet.
    ///
    /// Touches only the link column; returns `false` when the user is gone
    /// or already linked.
    async fn link_media_user(&self, id: UserId, media_user_id: &str) -> RepoResult<bool>;

    /// Get password hash for authentication
    async fn get_password_hash(&self, id: UserId) -> RepoResult<Option<String>>;

    /// Demote every VIP whose expiry is strictly before `now`; returns rows changed
    async fn bulk_demote_expired(&self, now: DateTime<Utc>) -> RepoResult<u64>;

    /// Count VIPs with expiry in `(from, to]`
    async fn count_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<i64>;

    /// List VIPs with expiry in `(from, to]`, soonest first
    async fn list_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: PageRequest,
    ) -> RepoResult<Vec<User>>;

    /// IDs of VIPs whose expiry is strictly before `now`, ascending
    async fn list_expired_ids(&self, now: DateTime<Utc>, page: PageRequest)
        -> RepoResult<Vec<UserId>>;

    /// Count VIPs whose expiry is after `now`
    async fn count_active_vip(&self, now: DateTime<Utc>) -> RepoResult<i64>;
}

// ============================================================================
// Audit / Access Records
// ============================================================================

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append an audit entry
    async fn create(&self, entry: &AuditEntry) -> RepoResult<()>;

    /// Delete entries created before `cutoff`; returns rows deleted
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> RepoResult<u64>;
}

#[async_trait]
pub trait AccessRecordRepository: Send + Sync {
    /// Delete access records older than `cutoff`; returns rows deleted
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> RepoResult<u64>;
}
