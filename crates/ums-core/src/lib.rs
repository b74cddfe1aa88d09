//! # ums-core
//!
//! Domain layer for the user management backend: card keys, VIP entitlement,
//! audit entries, and the traits (ports) that persistence, cache and external
//! services implement. No infrastructure dependencies live here.

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    generate_card_code, is_well_formed_card_code, AccountStatus, AuditAction, AuditEntry,
    AuditStatus, CardKey, CardStatus, CardType, ExpiryWarning, MediaUser, User, VipLevel,
    CARD_CODE_PREFIX, DEFAULT_MEMBER_ROLE_ID, UNUSABLE_PASSWORD_HASH,
};
pub use error::{DomainError, ErrorKind};
pub use traits::{
    AccessRecordRepository, AuditLogRepository, CardKeyCounts, CardKeyFilter,
    CardKeyRepository, LoginAttemptStore, MediaUserDirectory, Notifier, PageRequest,
    Redemption, RepoResult, UserRepository, MAX_PAGE_SIZE,
};
pub use value_objects::{CardKeyId, IdParseError, UserId};
