//! Business logic services
//!
//! Services borrow a [`ServiceContext`] and orchestrate the domain entities
//! and the collaborator traits it holds.

pub mod auth;
pub mod card_key;
pub mod cleanup;
pub mod context;
pub mod error;
pub mod login_guard;
pub mod user_sync;
pub mod vip_expiry;

pub use auth::AuthService;
pub use card_key::CardKeyService;
pub use cleanup::CleanupService;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use login_guard::{FailureOutcome, LoginGuard, LoginState};
pub use user_sync::UserSyncService;
pub use vip_expiry::VipExpiryService;
