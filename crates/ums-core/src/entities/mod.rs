//! Domain entities - core business objects

mod audit;
mod card_key;
mod notification;
mod user;

pub use audit::{AuditAction, AuditEntry, AuditStatus};
pub use card_key::{
    generate_card_code, is_well_formed_card_code, CardKey, CardStatus, CardType, CARD_CODE_PREFIX,
};
pub use notification::{ExpiryWarning, MediaUser};
pub use user::{
    AccountStatus, User, VipLevel, DEFAULT_MEMBER_ROLE_ID, UNUSABLE_PASSWORD_HASH,
};
