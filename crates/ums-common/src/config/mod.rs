//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, ConfigError, DatabaseConfig, EmailConfig, EmailProvider, Environment,
    LoginGuardConfig, MediaServerConfig, QueueConfig, RedisConfig, RetentionConfig,
    SchedulerConfig, TimeoutConfig, VipConfig,
};
