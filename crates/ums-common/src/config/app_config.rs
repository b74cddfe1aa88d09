//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub scheduler: SchedulerConfig,
    pub login_guard: LoginGuardConfig,
    pub vip: VipConfig,
    pub timeouts: TimeoutConfig,
    pub email: EmailConfig,
    pub queue: QueueConfig,
    /// `None` disables the user sync job
    pub media_server: Option<MediaServerConfig>,
    pub retention: RetentionConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Periodic job intervals
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub sync_interval: Duration,
    pub vip_interval: Duration,
    pub cleanup_interval: Duration,
    pub cleanup_initial_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(default_sync_interval_secs()),
            vip_interval: Duration::from_secs(default_vip_interval_secs()),
            cleanup_interval: Duration::from_secs(default_cleanup_interval_secs()),
            cleanup_initial_delay: Duration::from_secs(default_cleanup_initial_delay_secs()),
        }
    }
}

/// Failed login lockout policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginGuardConfig {
    pub max_attempts: u32,
    pub attempt_window: Duration,
    pub lock_duration: Duration,
}

impl Default for LoginGuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_login_max_attempts(),
            attempt_window: Duration::from_secs(default_login_attempt_window_secs()),
            lock_duration: Duration::from_secs(default_login_lock_secs()),
        }
    }
}

/// VIP expiry processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VipConfig {
    pub warning_days: i64,
    pub batch_size: i64,
    pub max_batches: u32,
}

impl Default for VipConfig {
    fn default() -> Self {
        Self {
            warning_days: default_vip_warning_days(),
            batch_size: default_vip_batch_size(),
            max_batches: default_vip_max_batches(),
        }
    }
}

/// Upper bounds on external calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub store: Duration,
    pub notify: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store: Duration::from_millis(default_store_timeout_ms()),
            notify: Duration::from_millis(default_notify_timeout_ms()),
        }
    }
}

/// Which email backend delivers notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailProvider {
    /// Write messages to the log only
    #[default]
    Log,
    Resend,
}

impl FromStr for EmailProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "resend" => Ok(Self::Resend),
            other => Err(format!("unknown email provider '{other}'")),
        }
    }
}

/// Email delivery settings
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub resend_api_key: Option<String>,
    pub from: String,
}

/// Bounded worker queue settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub capacity: usize,
    pub submit_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
            submit_timeout: Duration::from_millis(default_queue_submit_timeout_ms()),
        }
    }
}

/// Media server (Emby) connection
#[derive(Debug, Clone)]
pub struct MediaServerConfig {
    pub url: String,
    pub api_key: String,
}

/// Data retention windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    pub access_record_days: i64,
    pub audit_log_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            access_record_days: default_access_record_retention_days(),
            audit_log_days: default_audit_log_retention_days(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "ums-worker".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_sync_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_vip_interval_secs() -> u64 {
    3600 // 1 hour
}

fn default_cleanup_interval_secs() -> u64 {
    86400 // 24 hours
}

fn default_cleanup_initial_delay_secs() -> u64 {
    60
}

fn default_login_max_attempts() -> u32 {
    5
}

fn default_login_attempt_window_secs() -> u64 {
    1800 // 30 minutes
}

fn default_login_lock_secs() -> u64 {
    900 // 15 minutes
}

fn default_vip_warning_days() -> i64 {
    3
}

fn default_vip_batch_size() -> i64 {
    1000
}

fn default_vip_max_batches() -> u32 {
    100
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn default_notify_timeout_ms() -> u64 {
    10_000
}

fn default_email_from() -> String {
    "noreply@localhost".to_string()
}

fn default_queue_capacity() -> usize {
    256
}

fn default_queue_submit_timeout_ms() -> u64 {
    500
}

fn default_access_record_retention_days() -> i64 {
    90
}

fn default_audit_log_retention_days() -> i64 {
    180
}

/// Reads variables from a lookup function so tests need not touch the process environment
struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::MissingVar(name))
    }

    fn parse_or<T>(&self, name: &'static str, default: impl FnOnce() -> T) -> Result<T, ConfigError>
    where
        T: FromStr,
    {
        match self.get(name) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(name, raw)),
            None => Ok(default()),
        }
    }

    fn secs_or(&self, name: &'static str, default: fn() -> u64) -> Result<Duration, ConfigError> {
        let secs = self.parse_or(name, default)?;
        if secs == 0 {
            return Err(ConfigError::InvalidValue(name, "0".to_string()));
        }
        Ok(Duration::from_secs(secs))
    }

    fn millis_or(&self, name: &'static str, default: fn() -> u64) -> Result<Duration, ConfigError> {
        let millis = self.parse_or(name, default)?;
        if millis == 0 {
            return Err(ConfigError::InvalidValue(name, "0".to_string()));
        }
        Ok(Duration::from_millis(millis))
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let src = EnvSource { lookup };

        let env = match src.get("APP_ENV") {
            Some(raw) => match raw.to_lowercase().as_str() {
                "production" => Environment::Production,
                "staging" => Environment::Staging,
                "development" => Environment::Development,
                _ => return Err(ConfigError::InvalidValue("APP_ENV", raw)),
            },
            None => Environment::default(),
        };

        let email = EmailConfig {
            provider: src.parse_or("EMAIL_PROVIDER", EmailProvider::default)?,
            resend_api_key: src.get("RESEND_API_KEY"),
            from: src.get("EMAIL_FROM").unwrap_or_else(default_email_from),
        };
        if email.provider == EmailProvider::Resend && email.resend_api_key.is_none() {
            return Err(ConfigError::MissingVar("RESEND_API_KEY"));
        }

        let media_server = match (src.get("EMBY_URL"), src.get("EMBY_API_KEY")) {
            (Some(url), Some(api_key)) => Some(MediaServerConfig {
                url: url.trim_end_matches('/').to_string(),
                api_key,
            }),
            _ => None,
        };

        let login_max_attempts = src.parse_or("LOGIN_MAX_ATTEMPTS", default_login_max_attempts)?;
        if login_max_attempts == 0 {
            return Err(ConfigError::InvalidValue("LOGIN_MAX_ATTEMPTS", "0".to_string()));
        }

        let vip_batch_size = src.parse_or("VIP_BATCH_SIZE", default_vip_batch_size)?;
        if vip_batch_size <= 0 {
            return Err(ConfigError::InvalidValue(
                "VIP_BATCH_SIZE",
                vip_batch_size.to_string(),
            ));
        }

        let queue_capacity = src.parse_or("NOTIFY_QUEUE_CAPACITY", default_queue_capacity)?;
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("NOTIFY_QUEUE_CAPACITY", "0".to_string()));
        }

        Ok(Self {
            app: AppSettings {
                name: src.get("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            database: DatabaseConfig {
                url: src.required("DATABASE_URL")?,
                max_connections: src.parse_or("DATABASE_MAX_CONNECTIONS", default_max_connections)?,
                min_connections: src.parse_or("DATABASE_MIN_CONNECTIONS", default_min_connections)?,
            },
            redis: RedisConfig {
                url: src.required("REDIS_URL")?,
                max_connections: src
                    .parse_or("REDIS_MAX_CONNECTIONS", default_redis_max_connections)?,
            },
            scheduler: SchedulerConfig {
                sync_interval: src.secs_or("SYNC_INTERVAL_SECS", default_sync_interval_secs)?,
                vip_interval: src.secs_or("VIP_INTERVAL_SECS", default_vip_interval_secs)?,
                cleanup_interval: src
                    .secs_or("CLEANUP_INTERVAL_SECS", default_cleanup_interval_secs)?,
                cleanup_initial_delay: Duration::from_secs(src.parse_or(
                    "CLEANUP_INITIAL_DELAY_SECS",
                    default_cleanup_initial_delay_secs,
                )?),
            },
            login_guard: LoginGuardConfig {
                max_attempts: login_max_attempts,
                attempt_window: src.secs_or(
                    "LOGIN_ATTEMPT_WINDOW_SECS",
                    default_login_attempt_window_secs,
                )?,
                lock_duration: src.secs_or("LOGIN_LOCK_SECS", default_login_lock_secs)?,
            },
            vip: VipConfig {
                warning_days: src.parse_or("VIP_WARNING_DAYS", default_vip_warning_days)?,
                batch_size: vip_batch_size,
                max_batches: src.parse_or("VIP_MAX_BATCHES", default_vip_max_batches)?,
            },
            timeouts: TimeoutConfig {
                store: src.millis_or("STORE_TIMEOUT_MS", default_store_timeout_ms)?,
                notify: src.millis_or("NOTIFY_TIMEOUT_MS", default_notify_timeout_ms)?,
            },
            email,
            queue: QueueConfig {
                capacity: queue_capacity,
                submit_timeout: src
                    .millis_or("QUEUE_SUBMIT_TIMEOUT_MS", default_queue_submit_timeout_ms)?,
            },
            media_server,
            retention: RetentionConfig {
                access_record_days: src.parse_or(
                    "ACCESS_RECORD_RETENTION_DAYS",
                    default_access_record_retention_days,
                )?,
                audit_log_days: src
                    .parse_or("AUDIT_LOG_RETENTION_DAYS", default_audit_log_retention_days)?,
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
