//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in ums-core.

mod audit_log;
mod card_key;
mod error;
mod user;

pub use audit_log::{PgAccessRecordRepository, PgAuditLogRepository};
pub use card_key::PgCardKeyRepository;
pub use user::PgUserRepository;
