//! # ums-db
//!
//! Database layer implementing the repository traits from `ums-core` with
//! PostgreSQL via SQLx.
//!
//! - Connection pool management and schema bootstrap
//! - Database models with SQLx `FromRow` derives
//! - Model → entity mappers
//! - Repository implementations, including the transactional redemption
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ums_db::{apply_schema, create_pool, DatabaseConfig, PgCardKeyRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::default()).await?;
//!     apply_schema(&pool).await?;
//!     let card_keys = PgCardKeyRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{apply_schema, create_pool, DatabaseConfig, PgPool};
pub use repositories::{
    PgAccessRecordRepository, PgAuditLogRepository, PgCardKeyRepository, PgUserRepository,
};
