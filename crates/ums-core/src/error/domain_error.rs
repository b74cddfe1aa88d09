//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::entities::CardType;
use crate::value_objects::{CardKeyId, UserId};

/// Coarse classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Expired,
    WrongType,
    Locked,
    Conflict,
    Unavailable,
    Validation,
    Unauthorized,
    Internal,
}

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Card key not found")]
    CardKeyNotFound,

    #[error("Card key not found: {0}")]
    CardKeyIdNotFound(CardKeyId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // State Errors
    // =========================================================================
    #[error("Card key is disabled")]
    CardKeyDisabled,

    #[error("Card key has already been used")]
    CardKeyAlreadyUsed,

    #[error("Used card keys cannot be {0}")]
    CardKeyImmutable(&'static str),

    #[error("Card key has expired")]
    CardKeyExpired,

    #[error("Wrong card key type: expected {expected}, got {actual}")]
    WrongCardType { expected: CardType, actual: CardType },

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    #[error("Too many failed attempts, try again in {} minutes", .remaining_secs.div_ceil(60))]
    AccountLocked { remaining_secs: u64 },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Card key was already redeemed by someone else")]
    RedemptionConflict,

    #[error("Card code already exists")]
    CardCodeExists,

    #[error("Username already in use")]
    UsernameExists,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Notification error: {0}")]
    NotificationError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::CardKeyNotFound | Self::CardKeyIdNotFound(_) => "UNKNOWN_CARD_KEY",
            Self::UserNotFound(_) => "UNKNOWN_USER",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",

            // State
            Self::CardKeyDisabled => "CARD_KEY_DISABLED",
            Self::CardKeyAlreadyUsed => "CARD_KEY_USED",
            Self::CardKeyImmutable(_) => "CARD_KEY_IMMUTABLE",
            Self::CardKeyExpired => "CARD_KEY_EXPIRED",
            Self::WrongCardType { .. } => "WRONG_CARD_TYPE",

            // Authentication
            Self::AccountLocked { .. } => "ACCOUNT_LOCKED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountDisabled => "ACCOUNT_DISABLED",

            // Conflict
            Self::RedemptionConflict => "REDEMPTION_CONFLICT",
            Self::CardCodeExists => "CARD_CODE_EXISTS",
            Self::UsernameExists => "USERNAME_EXISTS",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::NotificationError(_) => "NOTIFICATION_ERROR",
            Self::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CardKeyNotFound | Self::CardKeyIdNotFound(_) | Self::UserNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::CardKeyDisabled | Self::CardKeyAlreadyUsed | Self::CardKeyImmutable(_) => {
                ErrorKind::InvalidState
            }
            Self::CardKeyExpired => ErrorKind::Expired,
            Self::WrongCardType { .. } => ErrorKind::WrongType,
            Self::AccountLocked { .. } => ErrorKind::Locked,
            Self::InvalidCredentials | Self::AccountDisabled => ErrorKind::Unauthorized,
            Self::RedemptionConflict | Self::CardCodeExists | Self::UsernameExists => {
                ErrorKind::Conflict
            }
            Self::DatabaseError(_)
            | Self::CacheError(_)
            | Self::NotificationError(_)
            | Self::ExternalServiceError(_)
            | Self::Timeout { .. } => ErrorKind::Unavailable,
            Self::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Check if a backing service failed or timed out
    pub fn is_unavailable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }
}
