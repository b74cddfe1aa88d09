//! Application error types
//!
//! Errors surfaced above the service layer: startup wiring, configuration,
//! and service failures handed to calling code.

use std::fmt;

use ums_core::{DomainError, ErrorKind};

use crate::config::ConfigError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Classification shared with domain errors
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Config(_) => ErrorKind::Validation,
            Self::Database(_) | Self::Cache(_) => ErrorKind::Unavailable,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Domain(e) => e.kind(),
        }
    }

    /// HTTP status code for callers that expose this error over HTTP
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            // A bad configuration is the operator's problem, not the caller's
            Self::Config(_) => 500,
            other => Self::status_code_for_kind(other.kind()),
        }
    }

    /// HTTP status code for a domain error classification
    #[must_use]
    pub fn status_code_for_kind(kind: ErrorKind) -> u16 {
        match kind {
            ErrorKind::Validation
            | ErrorKind::InvalidState
            | ErrorKind::Expired
            | ErrorKind::WrongType => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Locked => 429,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }

    /// Stable error code string
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(msg: impl fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
