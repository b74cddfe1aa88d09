//! # ums-common
//!
//! Shared utilities including configuration, error handling, password hashing, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{hash_password, verify_password};
pub use config::{
    AppConfig, AppSettings, ConfigError, DatabaseConfig, EmailConfig, EmailProvider, Environment,
    LoginGuardConfig, MediaServerConfig, QueueConfig, RedisConfig, RetentionConfig,
    SchedulerConfig, TimeoutConfig, VipConfig,
};
pub use error::{AppError, AppResult};
pub use telemetry::{try_init_tracing_with_config, TracingConfig, TracingError};
